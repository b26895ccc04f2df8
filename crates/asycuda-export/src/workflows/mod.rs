pub mod declaration;
pub mod encoders;
pub mod feedback;
pub mod pipeline;
pub mod reference;
pub mod resolution;
pub mod sales;
pub mod tabular;
pub mod validation;
