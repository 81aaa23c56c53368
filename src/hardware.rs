//! Hardware usage reporting for constrained hosts
//!
//! CPU and memory come from `sysinfo`. GPU numbers come from `nvidia-smi`;
//! hosts without it report no GPU, while a failing `nvidia-smi` is an error.

use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sysinfo::System;

use crate::{Error, Result};

/// Free VRAM (MB) below which optimized chat refuses to run
pub const LOW_VRAM_THRESHOLD_MB: f64 = 1000.0;

/// Snapshot of the first GPU
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GpuStats {
    pub name: String,
    pub memory_total_mb: f64,
    pub memory_used_mb: f64,
    pub memory_free_mb: f64,
    pub load_percent: f64,
}

/// Source of GPU statistics
#[async_trait]
pub trait GpuProbe: Send + Sync {
    /// Stats for the first GPU, `None` if the host has none
    async fn first_gpu(&self) -> Result<Option<GpuStats>>;
}

/// Queries NVIDIA GPUs through `nvidia-smi`
#[derive(Debug, Default, Clone, Copy)]
pub struct NvidiaSmi;

const NVIDIA_SMI_QUERY: &str =
    "--query-gpu=name,memory.total,memory.used,memory.free,utilization.gpu";

#[async_trait]
impl GpuProbe for NvidiaSmi {
    async fn first_gpu(&self) -> Result<Option<GpuStats>> {
        let Ok(binary) = which::which("nvidia-smi") else {
            tracing::debug!("nvidia-smi not installed, assuming no GPU");
            return Ok(None);
        };

        let output = tokio::process::Command::new(binary)
            .args([NVIDIA_SMI_QUERY, "--format=csv,noheader,nounits"])
            .output()
            .await?;

        if !output.status.success() {
            return Err(Error::Hardware(format!(
                "nvidia-smi exited with {}",
                output.status
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        stdout
            .lines()
            .find(|line| !line.trim().is_empty())
            .map(parse_nvidia_smi_line)
            .transpose()
    }
}

/// Parse one CSV row of the `nvidia-smi` query
///
/// # Errors
///
/// Returns error if the row doesn't have five fields or numbers don't parse
pub fn parse_nvidia_smi_line(line: &str) -> Result<GpuStats> {
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    let [name, total, used, free, load] = fields.as_slice() else {
        return Err(Error::Hardware(format!("unexpected nvidia-smi row: {line}")));
    };

    let number = |field: &str| {
        field
            .parse::<f64>()
            .map_err(|e| Error::Hardware(format!("bad nvidia-smi value {field:?}: {e}")))
    };

    Ok(GpuStats {
        name: (*name).to_string(),
        memory_total_mb: number(total)?,
        memory_used_mb: number(used)?,
        memory_free_mb: number(free)?,
        load_percent: number(load)?,
    })
}

/// CPU, memory, and GPU usage sampler
pub struct HardwareMonitor {
    system: Mutex<System>,
    gpu: Box<dyn GpuProbe>,
}

impl HardwareMonitor {
    /// Monitor using `nvidia-smi` for GPU stats
    #[must_use]
    pub fn new() -> Self {
        Self::with_gpu_probe(Box::new(NvidiaSmi))
    }

    /// Monitor with a custom GPU probe
    #[must_use]
    pub fn with_gpu_probe(gpu: Box<dyn GpuProbe>) -> Self {
        Self {
            system: Mutex::new(System::new()),
            gpu,
        }
    }

    /// CPU usage since the previous call, across all cores
    ///
    /// The first call has no baseline and reports 0.
    #[must_use]
    pub fn cpu_percent(&self) -> f32 {
        self.system
            .lock()
            .map(|mut sys| {
                sys.refresh_cpu_usage();
                sys.global_cpu_usage()
            })
            .ok()
            .filter(|usage| usage.is_finite())
            .unwrap_or_default()
    }

    /// Used memory as a percentage of total
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn memory_percent(&self) -> f64 {
        self.system
            .lock()
            .map(|mut sys| {
                sys.refresh_memory();
                let total = sys.total_memory();
                if total == 0 {
                    0.0
                } else {
                    sys.used_memory() as f64 / total as f64 * 100.0
                }
            })
            .unwrap_or_default()
    }

    /// First GPU stats, `Ok(None)` when the host has no GPU
    ///
    /// # Errors
    ///
    /// Returns error if the GPU probe fails
    pub async fn probe_gpu(&self) -> Result<Option<GpuStats>> {
        self.gpu.first_gpu().await
    }

    /// First GPU stats, `None` on any probe failure
    pub async fn gpu(&self) -> Option<GpuStats> {
        match self.probe_gpu().await {
            Ok(stats) => stats,
            Err(e) => {
                tracing::debug!(error = %e, "GPU stats unavailable");
                None
            }
        }
    }
}

impl Default for HardwareMonitor {
    fn default() -> Self {
        Self::new()
    }
}
