pub mod cvm_provider;

pub use cvm_provider::CvmProvider;
