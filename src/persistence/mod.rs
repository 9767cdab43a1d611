//! Disk persistence for trained models.
//!
//! Trained IVF and PQ models outlive the process that built them: the
//! assignment and transform stages may run later, elsewhere, or many
//! times. Each model saves into its own directory as a JSON manifest plus
//! a checksummed binary payload (see [`format`]), and loading verifies
//! everything before a model is handed back.

pub mod error;
pub mod format;
pub mod model_store;

pub use error::{PersistenceError, PersistenceResult};
pub use format::{ModelManifest, FORMAT_VERSION, MODEL_MAGIC};
pub use model_store::ModelPersistence;
