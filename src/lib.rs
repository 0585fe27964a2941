#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::float_cmp)]

pub mod assets;
pub mod entities;
pub mod errors;
pub mod gpu;
pub mod material;
pub mod procedural;
pub mod settings;
pub mod utils;

pub use assets::{Fetcher, ManualFetcher, Resource, ResourceCache, ResourceState, ThreadedFetcher};
pub use entities::{
    MaterialBindingRegistry, MaterialEntityItem, MaterialEntityProperties, MaterialEntityRenderer,
    ParentKind,
};
pub use errors::{ProcMatError, Result};
pub use gpu::{Batch, BatchCommand, RecordingBackend, RenderArgs, RenderMode, ShaderBackend};
pub use material::{
    MaterialCache, MaterialKey, MaterialLayer, MaterialModel, ParsedMaterials, ProceduralMaterial,
};
pub use procedural::{Procedural, ProceduralContext, ProceduralData, ProceduralProgramKey};
pub use settings::ProceduralSettings;
