//! Schema descriptors for each trained model generation.
//!
//! A descriptor fixes the column allow-list (and its order), the categorical
//! enumerations, numeric bounds and calendar behaviour the models of that
//! generation were trained with.

use clap::ValueEnum;
use serde::Deserialize;

pub mod columns {
    pub const WORK_TYPE: &str = "tipo_obra";
    pub const REGION: &str = "region_geografica";
    pub const START_MONTH: &str = "mes_inicio";
    pub const SEASON: &str = "temporada";
    pub const SEISMIC_RISK: &str = "riesgo_sismico";
    pub const FLOOD_RISK: &str = "riesgo_inundacion";
    pub const DURATION: &str = "duracion_planeada_dias";
    pub const BASE_BUDGET: &str = "presupuesto_base_mdp";
    pub const UPDATED_BUDGET: &str = "presupuesto_actualizado_mdp";
    pub const DISBURSED_FLOW: &str = "flujo_erogado_mdp";
    pub const PENDING_CASH: &str = "pendiente_en_caja_mdp";
    pub const REMAINING_FROM_BASE: &str = "restante_base_mdp";
    pub const RAINFALL: &str = "lluvia_promedio_mm";
    pub const PENDING_CONTRACTS: &str = "contratos_por_asignar";
    pub const SUPPLIERS: &str = "proveedores";
    pub const STAFF: &str = "trabajadores";
    pub const FLOOR_AREA: &str = "m2_construccion";
    pub const PLANNED_PROGRESS: &str = "avance_programado_pct";
    pub const ACTUAL_PROGRESS: &str = "avance_real_pct";
    pub const START_YEAR: &str = "anio_inicio";
    pub const SCHEDULE_MARGIN: &str = "margin_tiempo_dias";
}

use columns::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelGeneration {
    /// First generation: fixed season table, rainfall and supplier columns.
    Realista,
    /// Progress-aware generation with region-sensitive seasons.
    Avance,
    /// Calendar-aware generation with schedule margin and exact projection.
    Calendario,
}

impl ModelGeneration {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelGeneration::Realista => "realista",
            ModelGeneration::Avance => "avance",
            ModelGeneration::Calendario => "calendario",
        }
    }

    pub fn schema(&self) -> &'static Schema {
        match self {
            ModelGeneration::Realista => &REALISTA,
            ModelGeneration::Avance => &AVANCE,
            ModelGeneration::Calendario => &CALENDARIO,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeasonTable {
    Fixed,
    RegionAware,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bound {
    pub field: &'static str,
    pub min: f64,
    pub max: f64,
}

const fn bound(field: &'static str, min: f64, max: f64) -> Bound {
    Bound { field, min, max }
}

#[derive(Debug)]
pub struct Schema {
    pub generation: ModelGeneration,
    pub work_types: &'static [&'static str],
    pub regions: &'static [&'static str],
    pub season_table: SeasonTable,
    /// Model-facing columns, in the order the preprocessors expect them.
    pub columns: &'static [&'static str],
    pub bounds: &'static [Bound],
    /// Enables the margin override and exact date projection.
    pub calendar_aware: bool,
}

impl Schema {
    pub fn expects(&self, column: &str) -> bool {
        self.columns.contains(&column)
    }
}

/// Regions where October and November fall in the cyclone window.
pub const CYCLONE_REGIONS: [&str; 2] = ["Sureste", "Golfo"];

const FIRST_WORK_TYPES: [&str; 6] = [
    "Vivienda",
    "Escuela",
    "Hospital",
    "Puente",
    "Carretera",
    "Centro Comercial",
];

const FIRST_REGIONS: [&str; 6] = ["Centro", "Occidente", "Noreste", "Sur", "Sureste", "Golfo"];

const SECOND_WORK_TYPES: [&str; 8] = [
    "Vivienda",
    "Escuela",
    "Hospital",
    "Puente",
    "Carretera",
    "Centro Comercial",
    "Edificio Público",
    "Infraestructura Hidráulica",
];

const SECOND_REGIONS: [&str; 8] = [
    "Centro",
    "Occidente",
    "Bajío",
    "Noreste",
    "Noroeste",
    "Sur",
    "Sureste",
    "Golfo",
];

const COMMON_BOUNDS: [Bound; 8] = [
    bound(DURATION, 90.0, 540.0),
    bound(BASE_BUDGET, 5.0, 200.0),
    bound(UPDATED_BUDGET, 5.0, 250.0),
    bound(DISBURSED_FLOW, 0.0, 250.0),
    bound(PENDING_CONTRACTS, 0.0, 10.0),
    bound(STAFF, 10.0, 1000.0),
    bound(FLOOR_AREA, 100.0, 15000.0),
    bound(START_YEAR, 2000.0, 2100.0),
];

const REALISTA_BOUNDS: [Bound; 10] = [
    COMMON_BOUNDS[0],
    COMMON_BOUNDS[1],
    COMMON_BOUNDS[2],
    COMMON_BOUNDS[3],
    COMMON_BOUNDS[4],
    COMMON_BOUNDS[5],
    COMMON_BOUNDS[6],
    COMMON_BOUNDS[7],
    bound(RAINFALL, 30.0, 200.0),
    bound(SUPPLIERS, 1.0, 30.0),
];

const PROGRESS_BOUNDS: [Bound; 10] = [
    COMMON_BOUNDS[0],
    COMMON_BOUNDS[1],
    COMMON_BOUNDS[2],
    COMMON_BOUNDS[3],
    COMMON_BOUNDS[4],
    COMMON_BOUNDS[5],
    COMMON_BOUNDS[6],
    COMMON_BOUNDS[7],
    bound(PLANNED_PROGRESS, 0.0, 100.0),
    bound(ACTUAL_PROGRESS, 0.0, 100.0),
];

pub static REALISTA: Schema = Schema {
    generation: ModelGeneration::Realista,
    work_types: &FIRST_WORK_TYPES,
    regions: &FIRST_REGIONS,
    season_table: SeasonTable::Fixed,
    columns: &[
        WORK_TYPE,
        REGION,
        START_MONTH,
        SEASON,
        SEISMIC_RISK,
        FLOOD_RISK,
        DURATION,
        BASE_BUDGET,
        UPDATED_BUDGET,
        DISBURSED_FLOW,
        PENDING_CASH,
        RAINFALL,
        PENDING_CONTRACTS,
        SUPPLIERS,
        STAFF,
        FLOOR_AREA,
    ],
    bounds: &REALISTA_BOUNDS,
    calendar_aware: false,
};

pub static AVANCE: Schema = Schema {
    generation: ModelGeneration::Avance,
    work_types: &SECOND_WORK_TYPES,
    regions: &SECOND_REGIONS,
    season_table: SeasonTable::RegionAware,
    columns: &[
        WORK_TYPE,
        REGION,
        START_MONTH,
        SEASON,
        SEISMIC_RISK,
        FLOOD_RISK,
        DURATION,
        BASE_BUDGET,
        UPDATED_BUDGET,
        DISBURSED_FLOW,
        PENDING_CASH,
        REMAINING_FROM_BASE,
        PENDING_CONTRACTS,
        STAFF,
        FLOOR_AREA,
        PLANNED_PROGRESS,
        ACTUAL_PROGRESS,
    ],
    bounds: &PROGRESS_BOUNDS,
    calendar_aware: false,
};

pub static CALENDARIO: Schema = Schema {
    generation: ModelGeneration::Calendario,
    work_types: &SECOND_WORK_TYPES,
    regions: &SECOND_REGIONS,
    season_table: SeasonTable::RegionAware,
    columns: &[
        WORK_TYPE,
        REGION,
        START_MONTH,
        SEASON,
        SEISMIC_RISK,
        FLOOD_RISK,
        DURATION,
        BASE_BUDGET,
        UPDATED_BUDGET,
        DISBURSED_FLOW,
        PENDING_CASH,
        REMAINING_FROM_BASE,
        PENDING_CONTRACTS,
        STAFF,
        FLOOR_AREA,
        PLANNED_PROGRESS,
        ACTUAL_PROGRESS,
        SCHEDULE_MARGIN,
    ],
    bounds: &PROGRESS_BOUNDS,
    calendar_aware: true,
};
