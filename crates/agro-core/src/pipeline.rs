//! Definición inmutable del pipeline: stages en orden fijo, wiring alineado
//! por posición y fingerprint de la definición.

use serde_json::json;

use crate::errors::PipelineError;
use crate::hashing::hash_value;
use crate::stage::Stage;
use crate::wiring::StageWiring;

pub struct PipelineDefinition {
    pub stages: Vec<Box<dyn Stage>>,
    pub wiring: Vec<StageWiring>,
    pub definition_hash: String,
}

impl std::fmt::Debug for PipelineDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineDefinition")
            .field("stages", &self.stage_ids())
            .field("wiring", &self.wiring)
            .field("definition_hash", &self.definition_hash)
            .finish()
    }
}

impl PipelineDefinition {
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn stage_ids(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.id()).collect()
    }
}

/// Valida el wiring contra el orden de stages y calcula el hash de la
/// definición (ids + wiring, JSON canónico + blake3).
///
/// Invariante validado: toda proyección referencia un stage estrictamente
/// anterior en la secuencia.
pub fn build_pipeline_definition(stages: Vec<Box<dyn Stage>>,
                                 wiring: Vec<StageWiring>)
                                 -> Result<PipelineDefinition, PipelineError> {
    if stages.is_empty() {
        return Err(PipelineError::EmptyPipeline);
    }
    if stages.len() != wiring.len() {
        return Err(PipelineError::WiringMismatch { stages: stages.len(),
                                                   wirings: wiring.len() });
    }

    let ids: Vec<&str> = stages.iter().map(|s| s.id()).collect();
    for (i, id) in ids.iter().enumerate() {
        if ids[..i].contains(id) {
            return Err(PipelineError::DuplicateStageId(id.to_string()));
        }
    }

    for (i, w) in wiring.iter().enumerate() {
        if w.stage_id != ids[i] {
            return Err(PipelineError::WiringOutOfOrder { index: i,
                                                         wiring: w.stage_id.clone(),
                                                         stage: ids[i].to_string() });
        }
        for proj in &w.projections {
            let earlier = ids[..i].contains(&proj.source_stage.as_str());
            if !earlier {
                return Err(PipelineError::ForwardProjection { stage: w.stage_id.clone(),
                                                              source: proj.source_stage.clone() });
            }
        }
    }

    let fingerprint_input = json!({
        "engine_version": crate::constants::ENGINE_VERSION,
        "stages": ids,
        "wiring": wiring,
    });
    let definition_hash = hash_value(&fingerprint_input);

    Ok(PipelineDefinition { stages,
                            wiring,
                            definition_hash })
}
