//! The shared data model (spec §3): `Image`, `Recognition`, and the `Job`
//! queue envelope, plus the event payload types published by C3.

pub mod event;
pub mod image;
pub mod job;
pub mod recognition;

pub use event::{CompletedPayload, CompletedResult, EventContext, FailedPayload, GatewayEvent, ProcessingPayload, QueuedPayload};
pub use image::{Image, ImagePatch, MimeType, NewImage, MAX_IMAGE_BYTES};
pub use job::Job;
pub use recognition::{Engine, QrCompletion, QrFormat, QrLocation, Recognition, RecognitionStatus, ResultType, TextCompletion};
