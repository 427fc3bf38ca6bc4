//! Backend Selector
//!
//! Picks the Burn backend from cargo features. Only one backend can be active;
//! anything else falls back to NdArray on the CPU.

use burn::backend::Autodiff;

// ============ CUDA BACKEND ============
#[cfg(all(feature = "cuda", not(feature = "gpu"), not(feature = "torch")))]
mod backend_impl {
    pub use burn::backend::cuda_jit::{Cuda, CudaDevice};
    pub type MyBackend = Cuda;

    pub fn get_device() -> CudaDevice {
        CudaDevice::new(0)
    }

    pub const NAME: &str = "CUDA";
}

// ============ WGPU BACKEND ============
#[cfg(all(feature = "gpu", not(feature = "cuda"), not(feature = "torch")))]
mod backend_impl {
    pub use burn::backend::wgpu::{Wgpu, WgpuDevice};
    pub type MyBackend = Wgpu<f32, i32>;

    pub fn get_device() -> WgpuDevice {
        WgpuDevice::BestAvailable
    }

    pub const NAME: &str = "WGPU";
}

// ============ LIBTORCH BACKEND ============
#[cfg(all(feature = "torch", not(feature = "cuda"), not(feature = "gpu")))]
mod backend_impl {
    pub use burn::backend::libtorch::{LibTorch, LibTorchDevice};
    pub type MyBackend = LibTorch<f32>;

    pub fn get_device() -> LibTorchDevice {
        LibTorchDevice::Cuda(0)
    }

    pub const NAME: &str = "LibTorch";
}

// ============ CPU (NDARRAY) BACKEND / FALLBACK ============
#[cfg(not(any(
    all(feature = "cuda", not(feature = "gpu"), not(feature = "torch")),
    all(feature = "gpu", not(feature = "cuda"), not(feature = "torch")),
    all(feature = "torch", not(feature = "cuda"), not(feature = "gpu"))
)))]
mod backend_impl {
    pub use burn::backend::ndarray::{NdArray, NdArrayDevice};
    pub type MyBackend = NdArray;

    pub fn get_device() -> NdArrayDevice {
        NdArrayDevice::Cpu
    }

    pub const NAME: &str = "CPU (NdArray)";
}

// ============ PUBLIC EXPORTS ============
pub use backend_impl::{get_device, MyBackend};

/// Backend with autodiff for training
pub type TrainBackend = Autodiff<MyBackend>;

/// Name of the backend compiled in.
pub fn backend_name() -> &'static str {
    backend_impl::NAME
}
