//! Binary wire format for telemetry packets and published snapshots.

mod codec;
mod compress;
mod error;
mod record;

pub use codec::{ByteReader, ByteWriter, LONG_STRING_MAX, SHORT_STRING_MAX, truncate_str};
pub use compress::{compress, decompress};
pub use error::CodecError;
pub use record::{
    CombatantRecord, EncounterRecord, FlagRecord, LogLineRecord, Packet, SessionRecord,
    WireRecord, tag,
};
