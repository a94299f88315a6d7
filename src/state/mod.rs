mod persistence;
mod prompt;
mod session;

pub use persistence::{
    DocumentStore,
    PersistenceGateway,
    PersistedDocument,
    read_document,
    write_document,
};
pub use prompt::{
    ConfirmPrompt,
    Confirmation,
    ErrorPrompt,
    ExportChoice,
    ExportPrompt,
    Toast,
};
pub use session::{Phase, Session, SessionConfig};
