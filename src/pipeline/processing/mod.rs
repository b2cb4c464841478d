// Pipeline processing: profiling, normalization, curation and exports

pub mod curate;
pub mod graph_export;
pub mod insights;
pub mod normalize;
pub mod profile;
