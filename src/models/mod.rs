pub mod availability;
pub mod job;
pub mod loaders;
pub mod request;
pub mod target;

pub use availability::{AvailabilityStatus, AvailabilityVerdict, CatalogueEntry};
pub use job::{Job, JobDescriptor, JobPatch, JobStatus};
pub use loaders::load_batch_request;
pub use request::BatchRequest;
pub use target::{
    GenerationMode, GenerationParams, StudentTarget, SubclassTarget, Target, TargetKind,
    TargetRef,
};
