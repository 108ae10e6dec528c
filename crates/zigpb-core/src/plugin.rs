//! `protoc` plugin glue.
//!
//! Selects which requested files produce a unit, runs the [`Emitter`] over
//! them, and packs the result into a `CodeGeneratorResponse`.

use crate::descriptor::SchemaFile;
use crate::emit::{Emitter, GeneratorConfig, StatsWriter, Unit, UnitWriter};
use crate::error::{Error, Result};
use prost::Message;
use prost_types::compiler::code_generator_response::{Feature, File};
use prost_types::compiler::{CodeGeneratorRequest, CodeGeneratorResponse};
use tracing::{debug, info, warn};

/// Whether a schema file gets a unit at all.
///
/// Files without messages are skipped even when they declare enums: there is
/// nothing in them to encode or decode.
pub fn should_emit(file: &SchemaFile) -> bool {
    !file.messages.is_empty()
}

/// Generates units for every file in `file_to_generate`, in request order.
///
/// The first failing file aborts generation; its error names the file.
pub fn generate_units(request: &CodeGeneratorRequest, config: &GeneratorConfig) -> Result<Vec<Unit>> {
    let emitter = Emitter::new(config.clone());
    let mut stats = StatsWriter::default();
    let mut units = Vec::new();

    for name in &request.file_to_generate {
        let proto = request
            .proto_file
            .iter()
            .find(|f| f.name() == name)
            .ok_or_else(|| Error::MissingFile { name: name.clone() })?;

        let file = SchemaFile::from_proto(proto).map_err(|e| e.in_file(name))?;
        if !should_emit(&file) {
            debug!("Skipping {}: no messages", name);
            continue;
        }

        let plan = emitter.plan(&file).map_err(|e| e.in_file(name))?;
        stats.write_unit(&plan).expect("StatsWriter cannot fail");
        units.push(emitter.render(&plan));
    }

    info!(
        "Generated {} units: {} enums, {} messages, {} fields",
        stats.unit_count, stats.enum_count, stats.message_count, stats.field_count
    );

    Ok(units)
}

/// Handles one plugin request.
///
/// Schema problems are reported through `CodeGeneratorResponse.error`, as
/// `protoc` expects; the response never carries partial output.
pub fn generate(request: &CodeGeneratorRequest) -> CodeGeneratorResponse {
    let result = GeneratorConfig::from_parameter(request.parameter())
        .and_then(|config| generate_units(request, &config));

    let mut response = CodeGeneratorResponse {
        supported_features: Some(Feature::Proto3Optional as u64),
        ..Default::default()
    };

    match result {
        Ok(units) => {
            response.file = units
                .into_iter()
                .map(|unit| File {
                    name: Some(unit.name),
                    content: Some(unit.content),
                    ..Default::default()
                })
                .collect();
        }
        Err(e) => {
            warn!("Generation failed: {}", e);
            response.error = Some(e.to_string());
        }
    }

    response
}

/// Decodes an encoded `CodeGeneratorRequest` and handles it
pub fn generate_from_bytes(bytes: &[u8]) -> Result<CodeGeneratorResponse> {
    let request = CodeGeneratorRequest::decode(bytes)?;
    Ok(generate(&request))
}
