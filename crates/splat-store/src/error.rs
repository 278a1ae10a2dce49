use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error(transparent)]
    Gpu(#[from] splat_gpu::GpuError),
}

pub type Result<T> = std::result::Result<T, StoreError>;
