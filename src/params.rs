// Copyright 2024-2026, NVIDIA CORPORATION & AFFILIATES. All rights reserved.
//
// Redistribution and use in source and binary forms, with or without
// modification, are permitted provided that the following conditions
// are met:
//  * Redistributions of source code must retain the above copyright
//    notice, this list of conditions and the following disclaimer.
//  * Redistributions in binary form must reproduce the above copyright
//    notice, this list of conditions and the following disclaimer in the
//    documentation and/or other materials provided with the distribution.
//  * Neither the name of NVIDIA CORPORATION nor the names of its
//    contributors may be used to endorse or promote products derived
//    from this software without specific prior written permission.
//
// THIS SOFTWARE IS PROVIDED BY THE COPYRIGHT HOLDERS ``AS IS'' AND ANY
// EXPRESS OR IMPLIED WARRANTIES, INCLUDING, BUT NOT LIMITED TO, THE
// IMPLIED WARRANTIES OF MERCHANTABILITY AND FITNESS FOR A PARTICULAR
// PURPOSE ARE DISCLAIMED.  IN NO EVENT SHALL THE COPYRIGHT OWNER OR
// CONTRIBUTORS BE LIABLE FOR ANY DIRECT, INDIRECT, INCIDENTAL, SPECIAL,
// EXEMPLARY, OR CONSEQUENTIAL DAMAGES (INCLUDING, BUT NOT LIMITED TO,
// PROCUREMENT OF SUBSTITUTE GOODS OR SERVICES; LOSS OF USE, DATA, OR
// PROFITS; OR BUSINESS INTERRUPTION) HOWEVER CAUSED AND ON ANY THEORY
// OF LIABILITY, WHETHER IN CONTRACT, STRICT LIABILITY, OR TORT
// (INCLUDING NEGLIGENCE OR OTHERWISE) ARISING IN ANY WAY OUT OF THE USE
// OF THIS SOFTWARE, EVEN IF ADVISED OF THE POSSIBILITY OF SUCH DAMAGE.

//! Typed access to model configuration documents.
//!
//! Every model served by an AI server is described by a JSON configuration
//! document with named scalar and vector sections. [`ModelParams`] owns such a
//! document and provides a typed getter, existence check, and setter for each
//! parameter in a fixed catalog, declared once in the parameter table below.
//!
//! Sections other than the top level are arrays of records; scalar sections
//! use only record 0, while the `PRE_PROCESS` section carries one record per
//! model input. Parameters marked *runtime* are the only ones
//! [`merge`](ModelParams::merge) will overwrite from a patch document.
//!
//! # Example
//!
//! ```rust
//! use aiserver_client::params::ModelParams;
//!
//! let mut params = ModelParams::new();
//! params.set_device_type("CPU".into()).set_output_conf_threshold(0.4);
//! assert_eq!(params.device_type(), "CPU");
//! assert!(params.output_conf_threshold_exist());
//! ```

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// Document section holding a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    /// Top level of the document.
    Top,
    /// `DEVICE` section (scalar).
    Device,
    /// `PRE_PROCESS` section (vector: one record per model input).
    PreProcess,
    /// `MODEL_PARAMETERS` section (scalar).
    ModelParameters,
    /// `POST_PROCESS` section (scalar).
    PostProcess,
    /// `INTERNAL` section (scalar).
    Internal,
}

impl Section {
    /// JSON key of the section; empty for the top level.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Top => "",
            Self::Device => "DEVICE",
            Self::PreProcess => "PRE_PROCESS",
            Self::ModelParameters => "MODEL_PARAMETERS",
            Self::PostProcess => "POST_PROCESS",
            Self::Internal => "INTERNAL",
        }
    }

    /// Whether the section carries one record per model input.
    #[must_use]
    pub const fn is_vector(self) -> bool {
        matches!(self, Self::PreProcess)
    }
}

/// One entry of the parameter catalog.
#[derive(Debug, Clone, Copy)]
pub struct ParamDef {
    /// Parameter key as it appears in the JSON document.
    pub key: &'static str,
    /// Section holding the parameter.
    pub section: Section,
    /// Whether the parameter must be present in a complete configuration.
    pub mandatory: bool,
    /// Whether the parameter may be overwritten by a runtime patch.
    pub runtime: bool,
    /// Key read through when this parameter is absent.
    pub fallback: Option<&'static str>,
}

/// A model configuration document with typed parameter access.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelParams {
    cfg: Value,
    dirty: bool,
}

macro_rules! model_params_table {
    ($(
        $(#[$doc:meta])*
        $key:literal in $section:expr =>
            $ty:ty [$getter:ident, $exist:ident, $setter:ident],
            default $default:expr,
            mandatory $mandatory:expr,
            runtime $runtime:expr,
            fallback $fallback:expr;
    )*) => {
        /// The fixed parameter catalog: one entry per named parameter.
        pub const CATALOG: &[ParamDef] = &[
            $(ParamDef {
                key: $key,
                section: $section,
                mandatory: $mandatory,
                runtime: $runtime,
                fallback: $fallback,
            },)*
        ];

        impl ModelParams {
            $(
                $(#[$doc])*
                #[must_use]
                pub fn $getter(&self) -> $ty {
                    self.get_with_fallback($section, $key, $fallback, 0)
                        .unwrap_or_else(|| $default)
                }

                /// Checks whether the parameter (or its fallback) is present.
                #[must_use]
                pub fn $exist(&self) -> bool {
                    self.exists_with_fallback($section, $key, $fallback, 0)
                }

                /// Sets the parameter, creating its section as needed.
                pub fn $setter(&mut self, value: $ty) -> &mut Self {
                    self.set_value($section, $key, 0, serde_json::json!(value));
                    self
                }
            )*
        }
    };
}

model_params_table! {
    /// Version of the configuration document layout.
    "ConfigVersion" in Section::Top =>
        i64 [config_version, config_version_exist, set_config_version],
        default 1, mandatory false, runtime false, fallback None;

    /// Checksum of the model package.
    "Checksum" in Section::Top =>
        String [checksum, checksum_exist, set_checksum],
        default String::new(), mandatory false, runtime false, fallback None;

    /// Device type the model runs on (e.g. `"CPU"`, `"NPU"`).
    "DeviceType" in Section::Device =>
        String [device_type, device_type_exist, set_device_type],
        default "CPU".to_owned(), mandatory false, runtime false, fallback None;

    /// Runtime agent executing the model.
    "RuntimeAgent" in Section::Device =>
        String [runtime_agent, runtime_agent_exist, set_runtime_agent],
        default "DEFAULT".to_owned(), mandatory false, runtime false, fallback None;

    /// Per-inference device timeout in milliseconds.
    "DeviceTimeout_ms" in Section::Device =>
        f64 [device_timeout_ms, device_timeout_ms_exist, set_device_timeout_ms],
        default 180_000.0, mandatory false, runtime true, fallback None;

    /// Number of frames the device batches eagerly.
    "EagerBatchSize" in Section::Device =>
        i64 [eager_batch_size, eager_batch_size_exist, set_eager_batch_size],
        default 8, mandatory false, runtime true, fallback None;

    /// Path of the model file inside its zoo.
    "ModelPath" in Section::ModelParameters =>
        String [model_path, model_path_exist, set_model_path],
        default String::new(), mandatory true, runtime false, fallback None;

    /// Whether the model weights are quantized.
    "ModelQuantized" in Section::ModelParameters =>
        bool [model_quantized, model_quantized_exist, set_model_quantized],
        default false, mandatory false, runtime false, fallback None;

    /// Whether the model is pruned (not dense).
    "ModelPruned" in Section::ModelParameters =>
        bool [model_pruned, model_pruned_exist, set_model_pruned],
        default false, mandatory false, runtime false, fallback None;

    /// Input data type (`"Image"`, `"Tensor"`, ...).
    "InputType" in Section::PreProcess =>
        String [input_type, input_type_exist, set_input_type],
        default "Image".to_owned(), mandatory false, runtime false, fallback None;

    /// Image tensor layout the model expects.
    "InputTensorLayout" in Section::PreProcess =>
        String [input_tensor_layout, input_tensor_layout_exist, set_input_tensor_layout],
        default "NHWC".to_owned(), mandatory false, runtime false, fallback None;

    /// Image color space the model expects.
    "InputColorSpace" in Section::PreProcess =>
        String [input_color_space, input_color_space_exist, set_input_color_space],
        default "RGB".to_owned(), mandatory false, runtime false, fallback None;

    /// On-the-wire image format (`"JPEG"`, `"RAW"`).
    "InputImgFmt" in Section::PreProcess =>
        String [input_img_fmt, input_img_fmt_exist, set_input_img_fmt],
        default "JPEG".to_owned(), mandatory false, runtime true, fallback None;

    /// Pixel data type for `"RAW"` image inputs.
    "InputRawDataType" in Section::PreProcess =>
        String [input_raw_data_type, input_raw_data_type_exist, set_input_raw_data_type],
        default "UINT8".to_owned(), mandatory false, runtime true, fallback None;

    /// Input frame depth.
    "InputN" in Section::PreProcess =>
        i64 [input_n, input_n_exist, set_input_n],
        default 1, mandatory false, runtime false, fallback None;

    /// Input height.
    "InputH" in Section::PreProcess =>
        i64 [input_h, input_h_exist, set_input_h],
        default 0, mandatory false, runtime false, fallback None;

    /// Input width.
    "InputW" in Section::PreProcess =>
        i64 [input_w, input_w_exist, set_input_w],
        default 0, mandatory false, runtime false, fallback None;

    /// Input color depth.
    "InputC" in Section::PreProcess =>
        i64 [input_c, input_c_exist, set_input_c],
        default 0, mandatory false, runtime false, fallback None;

    /// Full input tensor shape; takes priority over `InputN/H/W/C`.
    "InputShape" in Section::PreProcess =>
        Vec<u64> [input_shape, input_shape_exist, set_input_shape],
        default Vec::new(), mandatory false, runtime false, fallback None;

    /// Post-processor type applied to raw model output.
    "OutputPostprocessType" in Section::PostProcess =>
        String [output_postprocess_type, output_postprocess_type_exist, set_output_postprocess_type],
        default "None".to_owned(), mandatory false, runtime false, fallback None;

    /// Confidence threshold applied to detections.
    "OutputConfThreshold" in Section::PostProcess =>
        f64 [output_conf_threshold, output_conf_threshold_exist, set_output_conf_threshold],
        default 0.1, mandatory false, runtime true, fallback None;

    /// Non-maximum-suppression threshold.
    "OutputNMSThreshold" in Section::PostProcess =>
        f64 [output_nms_threshold, output_nms_threshold_exist, set_output_nms_threshold],
        default 0.6, mandatory false, runtime true, fallback None;

    /// Number of top-scoring results to keep; zero keeps all.
    "OutputTopK" in Section::PostProcess =>
        i64 [output_top_k, output_top_k_exist, set_output_top_k],
        default 0, mandatory false, runtime true, fallback None;

    /// Upper bound on reported detections; reads through `OutputTopK`.
    "MaxDetections" in Section::PostProcess =>
        i64 [max_detections, max_detections_exist, set_max_detections],
        default 100, mandatory false, runtime true, fallback Some("OutputTopK");
}

impl ModelParams {
    /// Creates an empty configuration document.
    #[must_use]
    pub fn new() -> Self {
        Self {
            cfg: Value::Object(Map::new()),
            dirty: false,
        }
    }

    /// Wraps an existing JSON document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BadParameter`] when the value is not a JSON object.
    pub fn from_json(cfg: Value) -> Result<Self> {
        if !cfg.is_object() {
            return Err(Error::BadParameter(
                "model configuration must be a JSON object".into(),
            ));
        }
        Ok(Self { cfg, dirty: false })
    }

    /// Parses a JSON text into a configuration document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] for invalid JSON and [`Error::BadParameter`]
    /// when the text does not describe an object.
    pub fn from_text(text: &str) -> Result<Self> {
        Self::from_json(serde_json::from_str(text)?)
    }

    /// Borrows the underlying JSON document.
    #[must_use]
    pub fn as_json(&self) -> &Value {
        &self.cfg
    }

    /// Consumes the accessor and returns the underlying JSON document.
    #[must_use]
    pub fn into_json(self) -> Value {
        self.cfg
    }

    /// Whether any parameter was changed since construction or the last
    /// [`set_dirty`](Self::set_dirty)`(false)`.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Sets the dirty flag.
    pub fn set_dirty(&mut self, state: bool) {
        self.dirty = state;
    }

    /// Number of model inputs: the length of the `PRE_PROCESS` section, or 1
    /// when the section is absent.
    #[must_use]
    pub fn model_input_count(&self) -> usize {
        match self.cfg.get(Section::PreProcess.label()) {
            Some(Value::Array(records)) if !records.is_empty() => records.len(),
            _ => 1,
        }
    }

    /// Shape of the given model input.
    ///
    /// `InputShape` wins when present; otherwise the shape is synthesized
    /// from `InputN`, `InputH`, `InputW`, and `InputC`. With a non-zero
    /// `expected_len` the synthesized shape is padded to that length and a
    /// present `InputShape` of a different length is rejected.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BadParameter`] when `InputShape` is present but its
    /// length does not match a non-zero `expected_len`.
    pub fn model_input_shape(&self, inp_idx: usize, expected_len: usize) -> Result<Vec<u64>> {
        let explicit: Option<Vec<u64>> =
            self.get(Section::PreProcess, "InputShape", inp_idx).filter(|s: &Vec<u64>| !s.is_empty());
        if let Some(shape) = explicit {
            if expected_len != 0 && shape.len() != expected_len {
                return Err(Error::BadParameter(format!(
                    "InputShape for input #{inp_idx} must have {expected_len} elements, \
                     while it has {}",
                    shape.len()
                )));
            }
            return Ok(shape);
        }

        let dim = |key: &str| -> Option<u64> {
            self.get::<i64>(Section::PreProcess, key, inp_idx)
                .filter(|&v| v > 0)
                .map(|v| v as u64)
        };

        if expected_len != 0 {
            // Fixed-rank shape with N/H/W/C placed at their canonical axes.
            let mut shape = vec![1u64; expected_len];
            for (axis, key) in ["InputN", "InputH", "InputW", "InputC"].iter().enumerate() {
                if axis >= expected_len {
                    break;
                }
                if let Some(v) = dim(key) {
                    shape[axis] = v;
                }
            }
            Ok(shape)
        } else {
            Ok(["InputN", "InputH", "InputW", "InputC"]
                .iter()
                .filter_map(|key| dim(key))
                .collect())
        }
    }

    /// Verifies that every mandatory catalog parameter is present.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BadParameter`] naming the first missing parameter.
    pub fn validate(&self) -> Result<()> {
        for def in CATALOG.iter().filter(|def| def.mandatory) {
            let records = if def.section.is_vector() {
                self.model_input_count()
            } else {
                1
            };
            for idx in 0..records {
                if !self.exists(def.section, def.key, idx) {
                    return Err(Error::BadParameter(format!(
                        "mandatory model parameter '{}' is missing{}",
                        def.key,
                        if def.section.is_vector() {
                            format!(" for input #{idx}")
                        } else {
                            String::new()
                        }
                    )));
                }
            }
        }
        Ok(())
    }

    /// Merges a patch document into this one, overwriting runtime-mergeable
    /// parameters only. Vector sections merge index-wise up to the shorter
    /// section length.
    pub fn merge(&mut self, patch: &ModelParams) -> &mut Self {
        for def in CATALOG.iter().filter(|def| def.runtime) {
            let records = if def.section.is_vector() {
                patch.model_input_count().min(self.model_input_count())
            } else {
                1
            };
            for idx in 0..records {
                if let Some(value) = patch.raw(def.section, def.key, idx) {
                    let value = value.clone();
                    self.set_value(def.section, def.key, idx, value);
                }
            }
        }
        self
    }

    // -- generic typed access ------------------------------------------------

    /// Typed read of an arbitrary catalog parameter at the given record
    /// index. Returns `None` when the parameter is absent or of the wrong
    /// shape.
    #[must_use]
    pub fn get<T: DeserializeOwned>(&self, section: Section, key: &str, idx: usize) -> Option<T> {
        self.raw(section, key, idx)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Checks whether a parameter is present at the given record index.
    #[must_use]
    pub fn exists(&self, section: Section, key: &str, idx: usize) -> bool {
        self.raw(section, key, idx).is_some()
    }

    /// Typed write of an arbitrary parameter at the given record index,
    /// creating the section record on demand.
    pub fn set<T: serde::Serialize>(
        &mut self,
        section: Section,
        key: &str,
        idx: usize,
        value: T,
    ) -> &mut Self {
        self.set_value(section, key, idx, serde_json::json!(value));
        self
    }

    // -- internals -----------------------------------------------------------

    fn get_with_fallback<T: DeserializeOwned>(
        &self,
        section: Section,
        key: &str,
        fallback: Option<&str>,
        idx: usize,
    ) -> Option<T> {
        self.get(section, key, idx)
            .or_else(|| fallback.and_then(|fb_key| self.get(section, fb_key, idx)))
    }

    fn exists_with_fallback(
        &self,
        section: Section,
        key: &str,
        fallback: Option<&str>,
        idx: usize,
    ) -> bool {
        self.exists(section, key, idx)
            || fallback.is_some_and(|fb_key| self.exists(section, fb_key, idx))
    }

    fn raw(&self, section: Section, key: &str, idx: usize) -> Option<&Value> {
        match section {
            Section::Top => self.cfg.get(key),
            _ => self
                .cfg
                .get(section.label())?
                .as_array()?
                .get(idx)?
                .get(key),
        }
    }

    fn set_value(&mut self, section: Section, key: &str, idx: usize, value: Value) {
        let record = match section {
            Section::Top => &mut self.cfg,
            _ => {
                let map = self
                    .cfg
                    .as_object_mut()
                    .expect("model configuration is always an object");
                let entry = map
                    .entry(section.label())
                    .or_insert_with(|| Value::Array(vec![]));
                if !entry.is_array() {
                    *entry = Value::Array(vec![]);
                }
                let records = entry.as_array_mut().expect("just ensured array");
                while records.len() <= idx {
                    records.push(Value::Object(Map::new()));
                }
                &mut records[idx]
            }
        };

        if !record.is_object() {
            *record = Value::Object(Map::new());
        }
        let map = record.as_object_mut().expect("just ensured object");
        if map.get(key) != Some(&value) {
            map.insert(key.to_owned(), value);
            self.dirty = true;
        }
    }
}

impl Default for ModelParams {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ModelParams {
    /// Compact JSON text of the configuration document.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> ModelParams {
        ModelParams::from_json(json!({
            "ConfigVersion": 7,
            "DEVICE": [{"DeviceType": "NPU", "RuntimeAgent": "OPENVINO"}],
            "MODEL_PARAMETERS": [{"ModelPath": "zoo/det.bin", "ModelQuantized": true}],
            "PRE_PROCESS": [
                {"InputN": 1, "InputH": 224, "InputW": 224, "InputC": 3},
                {"InputShape": [1, 80, 80, 2]}
            ],
            "POST_PROCESS": [{"OutputConfThreshold": 0.25}],
        }))
        .unwrap()
    }

    #[test]
    fn getters_read_values_and_defaults() {
        let params = sample();
        assert_eq!(params.config_version(), 7);
        assert_eq!(params.device_type(), "NPU");
        assert_eq!(params.model_path(), "zoo/det.bin");
        assert!(params.model_quantized());
        assert_eq!(params.input_h(), 224);

        // Absent parameters fall back to catalog defaults.
        assert_eq!(params.input_img_fmt(), "JPEG");
        assert_eq!(params.output_nms_threshold(), 0.6);
        assert!(!params.model_pruned());
    }

    #[test]
    fn non_object_configuration_is_rejected() {
        assert!(ModelParams::from_json(json!([1, 2])).is_err());
        assert!(ModelParams::from_text("42").is_err());
        assert!(ModelParams::from_text("{bad").is_err());
    }

    #[test]
    fn setters_create_sections_and_track_dirty() {
        let mut params = ModelParams::new();
        assert!(!params.is_dirty());

        params.set_device_type("CPU".into());
        assert!(params.is_dirty());
        assert_eq!(params.device_type(), "CPU");
        assert_eq!(params.as_json()["DEVICE"][0]["DeviceType"], json!("CPU"));

        // Re-setting the same value does not re-mark.
        params.set_dirty(false);
        params.set_device_type("CPU".into());
        assert!(!params.is_dirty());
    }

    #[test]
    fn indexed_access_reaches_vector_records() {
        let params = sample();
        assert_eq!(
            params.get::<Vec<u64>>(Section::PreProcess, "InputShape", 1),
            Some(vec![1, 80, 80, 2])
        );
        assert!(!params.exists(Section::PreProcess, "InputShape", 0));
    }

    #[test]
    fn merge_overwrites_runtime_parameters_only() {
        let mut params = sample();
        let mut patch = ModelParams::new();
        patch
            .set_output_conf_threshold(0.5)
            .set_device_type("GPU".into())
            .set_model_path("evil".into());

        params.merge(&patch);

        assert_eq!(params.output_conf_threshold(), 0.5); // runtime: merged
        assert_eq!(params.device_type(), "NPU"); // static: kept
        assert_eq!(params.model_path(), "zoo/det.bin"); // static: kept
    }

    #[test]
    fn merge_vector_sections_index_wise() {
        let mut params = sample();
        let patch = ModelParams::from_json(json!({
            "PRE_PROCESS": [
                {"InputImgFmt": "RAW"},
                {"InputImgFmt": "RAW"},
                {"InputImgFmt": "RAW"}
            ]
        }))
        .unwrap();

        params.merge(&patch);

        // Only the two existing input records are touched.
        assert_eq!(
            params.get::<String>(Section::PreProcess, "InputImgFmt", 0),
            Some("RAW".into())
        );
        assert_eq!(
            params.get::<String>(Section::PreProcess, "InputImgFmt", 1),
            Some("RAW".into())
        );
        assert_eq!(params.model_input_count(), 2);
    }

    #[test]
    fn fallback_reads_through() {
        let params = ModelParams::from_json(json!({
            "POST_PROCESS": [{"OutputTopK": 5}]
        }))
        .unwrap();
        assert_eq!(params.max_detections(), 5);
        assert!(params.max_detections_exist());

        let params = ModelParams::new();
        assert_eq!(params.max_detections(), 100);
        assert!(!params.max_detections_exist());
    }

    #[test]
    fn validate_flags_missing_mandatory() {
        assert!(sample().validate().is_ok());
        let err = ModelParams::new().validate().unwrap_err();
        assert!(format!("{err}").contains("ModelPath"));
    }

    #[test]
    fn input_shape_explicit_wins() {
        let params = sample();
        assert_eq!(params.model_input_shape(1, 4).unwrap(), vec![1, 80, 80, 2]);
        assert!(matches!(
            params.model_input_shape(1, 3),
            Err(Error::BadParameter(_))
        ));
    }

    #[test]
    fn input_shape_synthesized_from_dims() {
        let params = sample();
        assert_eq!(params.model_input_shape(0, 4).unwrap(), vec![1, 224, 224, 3]);
        assert_eq!(params.model_input_shape(0, 0).unwrap(), vec![1, 224, 224, 3]);

        // Fixed rank pads missing trailing axes with ones.
        let partial = ModelParams::from_json(json!({
            "PRE_PROCESS": [{"InputH": 64, "InputW": 48}]
        }))
        .unwrap();
        assert_eq!(partial.model_input_shape(0, 4).unwrap(), vec![1, 64, 48, 1]);
    }

    #[test]
    fn model_input_count_defaults_to_one() {
        assert_eq!(ModelParams::new().model_input_count(), 1);
        assert_eq!(sample().model_input_count(), 2);
    }

    #[test]
    fn display_is_compact_json() {
        let params = ModelParams::from_json(json!({"ConfigVersion": 2})).unwrap();
        assert_eq!(params.to_string(), r#"{"ConfigVersion":2}"#);
    }
}
