pub mod amount;
pub mod mapping;
pub mod source_line;
pub mod target_line;

pub use amount::Amount;
pub use mapping::MatchMapping;
pub use source_line::{ReferenceKey, SourceLine, SourceLineRow};
pub use target_line::TargetLine;
