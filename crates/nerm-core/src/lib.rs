pub mod error;
pub mod record;
pub mod resource;
pub mod schema;
pub mod time;

pub use error::{CoreError, Result};
pub use record::Record;
pub use resource::ResourceKind;
pub use schema::{FieldKind, FieldSpec, RecordSchema};
pub use time::{CreatedSince, day_boundary};
