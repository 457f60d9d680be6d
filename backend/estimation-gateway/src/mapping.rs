//! Stage boundary mappings
//!
//! One function per hop of the pipeline. Each is pure, so the contract
//! between two stages can be checked without a network.

use grpc_clients::estimation::common::ModelType;
use grpc_clients::estimation::estimate::{EstimateRequest, EstimateResponse};
use grpc_clients::estimation::fetch::FetchDataResponse;
use grpc_clients::estimation::gateway::EstimationResponse;
use grpc_clients::estimation::prepare::{PrepareRequest, PrepareResponse};

/// Model to request from the estimate stage.
///
/// `UNKNOWN` and values outside the enum fall back to `OPENWATER`.
pub fn normalize_model_type(raw: i32) -> ModelType {
    match ModelType::try_from(raw) {
        Ok(ModelType::Ice) => ModelType::Ice,
        Ok(ModelType::Openwater) | Ok(ModelType::Unknown) | Err(_) => ModelType::Openwater,
    }
}

/// Columns the estimate stage takes raw from Fetch, bypassing Prepare.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Passthrough {
    pub motor_power_port: Vec<f64>,
    pub motor_power_stbd: Vec<f64>,
    pub original_sog: Vec<f64>,
}

impl Passthrough {
    /// Copy out the three raw columns before the fetch output moves on.
    pub fn from_fetch(fetched: &FetchDataResponse) -> Self {
        Self {
            motor_power_port: fetched.port_prop_motor_power.clone(),
            motor_power_stbd: fetched.stbd_prop_motor_power.clone(),
            original_sog: fetched.sog.clone(),
        }
    }
}

/// Fetch output -> Prepare input, column for column.
pub fn prepare_request_from_fetch(f: FetchDataResponse) -> PrepareRequest {
    PrepareRequest {
        index_number: f.index_number,
        time_and_date: f.time_and_date,
        port_prop_motor_current: f.port_prop_motor_current,
        port_prop_motor_power: f.port_prop_motor_power,
        port_prop_motor_speed: f.port_prop_motor_speed,
        port_prop_motor_voltage: f.port_prop_motor_voltage,
        stbd_prop_motor_current: f.stbd_prop_motor_current,
        stbd_prop_motor_power: f.stbd_prop_motor_power,
        stbd_prop_motor_speed: f.stbd_prop_motor_speed,
        stbd_prop_motor_voltage: f.stbd_prop_motor_voltage,
        rudder_order_port: f.rudder_order_port,
        rudder_order_stbd: f.rudder_order_stbd,
        rudder_position_port: f.rudder_position_port,
        rudder_position_stbd: f.rudder_position_stbd,
        propeller_pitch_port: f.propeller_pitch_port,
        propeller_pitch_stbd: f.propeller_pitch_stbd,
        shaft_rpm_indication_port: f.shaft_rpm_indication_port,
        shaft_rpm_indication_stbd: f.shaft_rpm_indication_stbd,
        nav_time: f.nav_time,
        latitude: f.latitude,
        longitude: f.longitude,
        sog: f.sog,
        cog: f.cog,
        hdt: f.hdt,
        wind_direction_relative: f.wind_direction_relative,
        wind_speed: f.wind_speed,
        depth: f.depth,
        epoch_time: f.epoch_time,
        brash_ice: f.brash_ice,
        ramming_count: f.ramming_count,
        ice_concentration: f.ice_concentration,
        ice_thickness: f.ice_thickness,
        flow_size: f.flow_size,
        beaufort_number: f.beaufort_number,
        wave_direction: f.wave_direction,
        wave_height_ave: f.wave_height_ave,
        max_swell_height: f.max_swell_height,
        wave_length: f.wave_length,
        wave_period_ave: f.wave_period_ave,
        encounter_frequency_ave: f.encounter_frequency_ave,
    }
}

/// Prepare output plus raw motor power and speed over ground from Fetch
/// -> Estimate input.
pub fn estimate_request_from(
    prepared: PrepareResponse,
    passthrough: Passthrough,
    model_type: ModelType,
) -> EstimateRequest {
    EstimateRequest {
        port_prop_motor_speed: prepared.port_prop_motor_speed,
        stbd_prop_motor_speed: prepared.stbd_prop_motor_speed,
        propeller_pitch_port: prepared.propeller_pitch_port,
        propeller_pitch_stbd: prepared.propeller_pitch_stbd,
        sog: prepared.sog,
        wind_direction_relative: prepared.wind_direction_relative,
        wind_speed: prepared.wind_speed,
        beaufort_number: prepared.beaufort_number,
        wave_direction: prepared.wave_direction,
        wave_length: prepared.wave_length,
        motor_power_port: passthrough.motor_power_port,
        motor_power_stbd: passthrough.motor_power_stbd,
        original_sog: passthrough.original_sog,
        model_type: model_type as i32,
    }
}

/// Estimate output -> the gateway's own response.
pub fn estimation_response_from(estimated: EstimateResponse) -> EstimationResponse {
    EstimationResponse {
        power_estimate: estimated.power_estimate,
        power_actual: estimated.power_actual,
        speed_over_ground: estimated.speed_over_ground,
    }
}
