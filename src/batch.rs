use std::path::Path;

use anyhow::Context;
use tracing::{info, warn};

use crate::error::AssessmentError;
use crate::inference::ModelPair;
use crate::models::ProjectInput;
use crate::pipeline::{self, Assessment, PipelineOptions};

/// One CSV row and what assessing it produced.
#[derive(Debug)]
pub struct BatchOutcome {
    /// 1-based line number in the source file, header included.
    pub row: usize,
    pub label: String,
    pub result: Result<Assessment, AssessmentError>,
}

/// Assesses every row of `csv_path` as an independent request.
///
/// Rows that cannot be parsed or validated are reported, not fatal. Only an
/// unreadable file aborts the batch.
pub fn assess_csv(
    models: &ModelPair,
    csv_path: &Path,
    options: PipelineOptions,
) -> anyhow::Result<Vec<BatchOutcome>> {
    let mut reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let mut outcomes = Vec::new();

    for (idx, result) in reader.deserialize::<ProjectInput>().enumerate() {
        let row = idx + 2;
        let outcome = match result {
            Ok(input) => {
                let label = input
                    .name
                    .clone()
                    .filter(|name| !name.trim().is_empty())
                    .unwrap_or_else(|| format!("row {row}"));
                BatchOutcome {
                    row,
                    label,
                    result: pipeline::assess(models, input, options),
                }
            }
            Err(err) => BatchOutcome {
                row,
                label: format!("row {row}"),
                result: Err(AssessmentError::validation("row", err.to_string())),
            },
        };

        if let Err(err) = &outcome.result {
            warn!(row, error = %err, "row not assessed");
        }
        outcomes.push(outcome);
    }

    info!(
        rows = outcomes.len(),
        assessed = outcomes.iter().filter(|o| o.result.is_ok()).count(),
        path = %csv_path.display(),
        "batch complete"
    );
    Ok(outcomes)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::models::Tier;
    use crate::pipeline::tests::stub_models;
    use crate::schema::CALENDARIO;

    const HEADER: &str = "proyecto,tipo_obra,region_geografica,mes_inicio,riesgo_sismico,riesgo_inundacion,\
duracion_planeada_dias,presupuesto_base_mdp,presupuesto_actualizado_mdp,flujo_erogado_mdp,\
contratos_por_asignar,trabajadores,m2_construccion,avance_programado_pct,avance_real_pct,\
anio_inicio,fecha_fin_planeada";

    fn write_csv(rows: &[&str]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "{HEADER}").expect("write header");
        for row in rows {
            writeln!(file, "{row}").expect("write row");
        }
        file
    }

    #[test]
    fn assesses_rows_and_reports_bad_ones() {
        let file = write_csv(&[
            "Escuela Norte,Escuela,Golfo,Octubre,Bajo,Alto,365,50,55,40,1,300,3000,60,50,2024,2025-12-30",
            ",Estadio,Golfo,Octubre,Bajo,Bajo,365,50,55,40,1,300,3000,60,50,2024,2025-12-30",
            "Puente Sur,Puente,Sur,Marzo,Bajo,Bajo,muchos,50,55,40,1,300,3000,60,50,2024,2025-12-30",
        ]);
        let models = stub_models(&CALENDARIO, 0.8, Some(200.0));
        let outcomes =
            assess_csv(&models, file.path(), PipelineOptions::default()).expect("readable csv");

        assert_eq!(outcomes.len(), 3);
        assert_eq!(outcomes[0].label, "Escuela Norte");
        let first = outcomes[0].result.as_ref().expect("first row assessed");
        assert_eq!(first.risk.tier, Tier::High);
        assert_eq!(first.record.derived.season.label(), "ciclónica");

        assert_eq!(outcomes[1].label, "row 3");
        assert!(outcomes[1]
            .result
            .as_ref()
            .is_err_and(|err| err.to_string().contains("tipo_obra")));

        assert_eq!(outcomes[2].row, 4);
        assert!(outcomes[2].result.as_ref().is_err_and(AssessmentError::is_validation));
    }

    #[test]
    fn empty_optional_columns_deserialize_as_missing() {
        let file = write_csv(&[
            "Clinica,Hospital,Centro,Enero,Medio,Bajo,200,20,22,10,0,80,900,,,,",
        ]);
        let models = stub_models(&CALENDARIO, 0.1, None);
        let outcomes =
            assess_csv(&models, file.path(), PipelineOptions::default()).expect("readable csv");
        let err = outcomes[0].result.as_ref().unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("avance_programado_pct"));
    }

    #[test]
    fn unreadable_file_aborts() {
        let models = stub_models(&CALENDARIO, 0.1, None);
        let result = assess_csv(
            &models,
            Path::new("/nonexistent/obras.csv"),
            PipelineOptions::default(),
        );
        assert!(result.is_err());
    }
}
