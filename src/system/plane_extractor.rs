//! PlaneExtractor - per-frame orchestration of detection, fusion and merge.
//!
//! Detection and local merge run in parallel, one job per sensor, on a fixed
//! pool of scoped worker threads fed through a channel. Fusion and the
//! global merge then run on the calling thread, which owns the global list.

use std::sync::Arc;
use std::thread;
use std::time::Instant;

use crossbeam_channel::unbounded;
use tracing::{debug, info, warn};

use crate::config::PipelineConfig;
use crate::extraction::{SensorError, SensorExtractor, SensorJob, SensorOutput, SensorStats};
use crate::fusion::{fuse_sensor_lists_detailed, merge_global};
use crate::geometry::SE3;
use crate::pbmap::PatchList;
use crate::segmentation::{NormalEstimator, RansacSegmenter, RegionSegmenter};

use super::frame::Frame;
use super::messages::SensorResultMsg;
use super::result::{FrameResult, TimingStats};

/// Extracts and fuses plane patches from a ring of sensors.
pub struct PlaneExtractor {
    /// Sensor-to-rig transform of each sensor.
    extrinsics: Vec<SE3>,
    estimator: Arc<dyn NormalEstimator>,
    segmenter: Arc<dyn RegionSegmenter>,
    config: PipelineConfig,
}

impl PlaneExtractor {
    pub fn new(
        extrinsics: Vec<SE3>,
        estimator: Arc<dyn NormalEstimator>,
        segmenter: Arc<dyn RegionSegmenter>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            extrinsics,
            estimator,
            segmenter,
            config,
        }
    }

    /// Extractor using the built-in normal estimator and RANSAC segmenter.
    pub fn with_default_detectors(extrinsics: Vec<SE3>, config: PipelineConfig) -> Self {
        let estimator = Arc::new(config.normals.clone());
        let segmenter = Arc::new(RansacSegmenter::new(config.ransac.clone()));
        Self::new(extrinsics, estimator, segmenter, config)
    }

    pub fn num_sensors(&self) -> usize {
        self.extrinsics.len()
    }

    pub fn extrinsics(&self) -> &[SE3] {
        &self.extrinsics
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Process one frame.
    ///
    /// `previous_local` holds the local lists returned for the previous frame
    /// (`FrameResult::local`); each sensor's new detections are merged into
    /// its previous list. A sensor that fails its preconditions contributes
    /// nothing to this frame's fusion and keeps its previous local list.
    pub fn process_frame(&self, frame: &Frame, previous_local: Option<&[PatchList]>) -> FrameResult {
        let t_start = Instant::now();
        let mut timing = TimingStats::zero();

        let num_sensors = frame.num_sensors();
        let seeds: Vec<PatchList> = (0..num_sensors)
            .map(|i| previous_local.and_then(|lists| lists.get(i)).cloned().unwrap_or_default())
            .collect();

        // Step 1: per-sensor detection and local merge (parallel)
        let t_detect = Instant::now();
        let outcomes = self.extract_all(frame, seeds.clone());
        timing.detection_ms = t_detect.elapsed().as_secs_f64() * 1000.0;

        let mut fused_input = Vec::with_capacity(num_sensors);
        let mut local = Vec::with_capacity(num_sensors);
        let mut sensor_stats = Vec::with_capacity(num_sensors);
        let mut sensor_errors = Vec::new();
        for (outcome, seed) in outcomes.into_iter().zip(seeds) {
            match outcome {
                Ok(output) => {
                    sensor_stats.push(output.stats);
                    fused_input.push(output.patches.clone());
                    local.push(output.patches);
                }
                Err(err) => {
                    warn!("[PlaneExtractor] {}", err);
                    sensor_stats.push(SensorStats::default());
                    fused_input.push(PatchList::new());
                    local.push(seed);
                    sensor_errors.push(err);
                }
            }
        }

        // Step 2: cross-sensor fusion
        let t_fusion = Instant::now();
        let fusion = fuse_sensor_lists_detailed(&fused_input, &self.config.fusion);
        timing.fusion_ms = t_fusion.elapsed().as_secs_f64() * 1000.0;

        // Step 3: global merge
        let t_merge = Instant::now();
        let mut patches = fusion.patches;
        let global_merge = merge_global(&mut patches, &self.config.global_merge);
        timing.global_merge_ms = t_merge.elapsed().as_secs_f64() * 1000.0;

        timing.total_ms = t_start.elapsed().as_secs_f64() * 1000.0;
        debug!(
            "[PlaneExtractor] timing: detection={:.1}ms fusion={:.1}ms merge={:.1}ms",
            timing.detection_ms, timing.fusion_ms, timing.global_merge_ms
        );
        info!(
            "[PlaneExtractor] frame {}: {} patches from {} sensors ({} failed) in {:.1} ms",
            frame.timestamp_ns,
            patches.len(),
            num_sensors,
            sensor_errors.len(),
            timing.total_ms
        );

        FrameResult {
            timestamp_ns: frame.timestamp_ns,
            patches,
            local,
            sensor_errors,
            sensor_stats,
            fusion_merges: fusion.merged,
            global_merge,
            timing,
        }
    }

    /// Run every sensor's extraction on the worker pool and wait for all of
    /// them. Results are returned in sensor order.
    fn extract_all(&self, frame: &Frame, seeds: Vec<PatchList>) -> Vec<Result<SensorOutput, SensorError>> {
        let num_sensors = frame.num_sensors();
        let mut results: Vec<Option<Result<SensorOutput, SensorError>>> = (0..num_sensors).map(|_| None).collect();

        let (job_sender, job_receiver) = unbounded();
        let (result_sender, result_receiver) = unbounded::<SensorResultMsg>();

        for (sensor_id, (cloud, seed)) in frame.clouds.iter().zip(seeds).enumerate() {
            match self.extrinsics.get(sensor_id) {
                Some(extrinsic) => {
                    let job = SensorJob {
                        sensor_id,
                        cloud,
                        extrinsic: *extrinsic,
                        seed,
                    };
                    // The receiver is alive until the workers below are done
                    let _ = job_sender.send(job);
                }
                None => results[sensor_id] = Some(Err(SensorError::MissingExtrinsic { sensor_id })),
            }
        }
        drop(job_sender);

        let num_workers = self.config.num_workers.clamp(1, num_sensors.max(1));
        thread::scope(|scope| {
            for _ in 0..num_workers {
                let job_receiver = job_receiver.clone();
                let result_sender = result_sender.clone();
                let extractor = SensorExtractor::new(
                    self.estimator.as_ref(),
                    self.segmenter.as_ref(),
                    &self.config.extraction,
                );
                scope.spawn(move || {
                    for job in job_receiver.iter() {
                        let sensor_id = job.sensor_id;
                        let result = extractor.extract(job);
                        if result_sender.send(SensorResultMsg { sensor_id, result }).is_err() {
                            break;
                        }
                    }
                });
            }
        });
        drop(result_sender);

        for msg in result_receiver.iter() {
            results[msg.sensor_id] = Some(msg.result);
        }

        results
            .into_iter()
            .enumerate()
            .map(|(sensor_id, r)| r.unwrap_or(Err(SensorError::MissingExtrinsic { sensor_id })))
            .collect()
    }
}
