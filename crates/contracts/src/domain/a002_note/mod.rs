pub mod aggregate;

pub use aggregate::{Note, NoteDto, NoteFlagsDto, NoteId, NoteType};
