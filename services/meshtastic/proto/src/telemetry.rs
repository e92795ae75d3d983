//! Telemetry payloads (`TELEMETRY_APP`).

use serde::Serialize;

/// Telemetry report: a timestamp plus one family of metrics.
#[derive(Clone, PartialEq, ::prost::Message, Serialize)]
pub struct Telemetry {
    /// Seconds since the epoch
    #[prost(fixed32, tag = "1")]
    pub time: u32,
    /// Reported metrics
    #[prost(oneof = "telemetry::Variant", tags = "2, 3, 4, 5, 6, 7")]
    #[serde(flatten)]
    pub variant: Option<telemetry::Variant>,
}

/// Nested types for [`Telemetry`].
pub mod telemetry {
    use serde::Serialize;

    /// Metric family carried by a report
    #[derive(Clone, PartialEq, ::prost::Oneof, Serialize)]
    #[serde(rename_all = "snake_case")]
    pub enum Variant {
        /// Battery and airtime
        #[prost(message, tag = "2")]
        DeviceMetrics(super::DeviceMetrics),
        /// Environment sensors
        #[prost(message, tag = "3")]
        EnvironmentMetrics(super::EnvironmentMetrics),
        /// Air quality sensors
        #[prost(message, tag = "4")]
        AirQualityMetrics(super::AirQualityMetrics),
        /// Power monitor
        #[prost(message, tag = "5")]
        PowerMetrics(super::PowerMetrics),
        /// Local mesh statistics
        #[prost(message, tag = "6")]
        LocalStats(super::LocalStats),
        /// Health sensors
        #[prost(message, tag = "7")]
        HealthMetrics(super::HealthMetrics),
    }
}

/// Battery and airtime counters of a node.
#[derive(Clone, PartialEq, ::prost::Message, Serialize)]
pub struct DeviceMetrics {
    /// Battery level in percent, over 100 when powered
    #[prost(uint32, optional, tag = "1")]
    pub battery_level: Option<u32>,
    /// Battery voltage
    #[prost(float, optional, tag = "2")]
    pub voltage: Option<f32>,
    /// Channel utilization in percent
    #[prost(float, optional, tag = "3")]
    pub channel_utilization: Option<f32>,
    /// Transmit airtime in percent over the last hour
    #[prost(float, optional, tag = "4")]
    pub air_util_tx: Option<f32>,
    /// Seconds since boot
    #[prost(uint32, optional, tag = "5")]
    pub uptime_seconds: Option<u32>,
}

/// Environment sensor readings.
#[derive(Clone, PartialEq, ::prost::Message, Serialize)]
pub struct EnvironmentMetrics {
    /// Temperature in degrees Celsius
    #[prost(float, optional, tag = "1")]
    pub temperature: Option<f32>,
    /// Relative humidity in percent
    #[prost(float, optional, tag = "2")]
    pub relative_humidity: Option<f32>,
    /// Barometric pressure in hPa
    #[prost(float, optional, tag = "3")]
    pub barometric_pressure: Option<f32>,
    /// Gas resistance in MOhm
    #[prost(float, optional, tag = "4")]
    pub gas_resistance: Option<f32>,
    /// Voltage
    #[prost(float, optional, tag = "5")]
    pub voltage: Option<f32>,
    /// Current
    #[prost(float, optional, tag = "6")]
    pub current: Option<f32>,
    /// Indoor air quality index
    #[prost(uint32, optional, tag = "7")]
    pub iaq: Option<u32>,
    /// Distance in mm
    #[prost(float, optional, tag = "8")]
    pub distance: Option<f32>,
    /// Ambient light
    #[prost(float, optional, tag = "9")]
    pub lux: Option<f32>,
    /// White light
    #[prost(float, optional, tag = "10")]
    pub white_lux: Option<f32>,
    /// Infrared light
    #[prost(float, optional, tag = "11")]
    pub ir_lux: Option<f32>,
    /// Ultraviolet light
    #[prost(float, optional, tag = "12")]
    pub uv_lux: Option<f32>,
    /// Wind direction in degrees
    #[prost(uint32, optional, tag = "13")]
    pub wind_direction: Option<u32>,
    /// Wind speed in m/s
    #[prost(float, optional, tag = "14")]
    pub wind_speed: Option<f32>,
    /// Weight in kg
    #[prost(float, optional, tag = "15")]
    pub weight: Option<f32>,
    /// Wind gust in m/s
    #[prost(float, optional, tag = "16")]
    pub wind_gust: Option<f32>,
    /// Wind lull in m/s
    #[prost(float, optional, tag = "17")]
    pub wind_lull: Option<f32>,
    /// Radiation in uR/h
    #[prost(float, optional, tag = "18")]
    pub radiation: Option<f32>,
}

/// Multi-channel power monitor readings.
#[derive(Clone, PartialEq, ::prost::Message, Serialize)]
pub struct PowerMetrics {
    /// Channel 1 voltage
    #[prost(float, optional, tag = "1")]
    pub ch1_voltage: Option<f32>,
    /// Channel 1 current
    #[prost(float, optional, tag = "2")]
    pub ch1_current: Option<f32>,
    /// Channel 2 voltage
    #[prost(float, optional, tag = "3")]
    pub ch2_voltage: Option<f32>,
    /// Channel 2 current
    #[prost(float, optional, tag = "4")]
    pub ch2_current: Option<f32>,
    /// Channel 3 voltage
    #[prost(float, optional, tag = "5")]
    pub ch3_voltage: Option<f32>,
    /// Channel 3 current
    #[prost(float, optional, tag = "6")]
    pub ch3_current: Option<f32>,
}

/// Particulate and CO2 sensor readings.
#[derive(Clone, PartialEq, ::prost::Message, Serialize)]
pub struct AirQualityMetrics {
    /// PM1.0 standard
    #[prost(uint32, optional, tag = "1")]
    pub pm10_standard: Option<u32>,
    /// PM2.5 standard
    #[prost(uint32, optional, tag = "2")]
    pub pm25_standard: Option<u32>,
    /// PM10.0 standard
    #[prost(uint32, optional, tag = "3")]
    pub pm100_standard: Option<u32>,
    /// PM1.0 environmental
    #[prost(uint32, optional, tag = "4")]
    pub pm10_environmental: Option<u32>,
    /// PM2.5 environmental
    #[prost(uint32, optional, tag = "5")]
    pub pm25_environmental: Option<u32>,
    /// PM10.0 environmental
    #[prost(uint32, optional, tag = "6")]
    pub pm100_environmental: Option<u32>,
    /// Particles over 0.3um
    #[prost(uint32, optional, tag = "7")]
    pub particles_03um: Option<u32>,
    /// Particles over 0.5um
    #[prost(uint32, optional, tag = "8")]
    pub particles_05um: Option<u32>,
    /// Particles over 1.0um
    #[prost(uint32, optional, tag = "9")]
    pub particles_10um: Option<u32>,
    /// Particles over 2.5um
    #[prost(uint32, optional, tag = "10")]
    pub particles_25um: Option<u32>,
    /// Particles over 5.0um
    #[prost(uint32, optional, tag = "11")]
    pub particles_50um: Option<u32>,
    /// Particles over 10.0um
    #[prost(uint32, optional, tag = "12")]
    pub particles_100um: Option<u32>,
    /// CO2 in ppm
    #[prost(uint32, optional, tag = "13")]
    pub co2: Option<u32>,
}

/// Mesh statistics of the attached node.
#[derive(Clone, PartialEq, ::prost::Message, Serialize)]
pub struct LocalStats {
    /// Seconds since boot
    #[prost(uint32, tag = "1")]
    pub uptime_seconds: u32,
    /// Channel utilization in percent
    #[prost(float, tag = "2")]
    pub channel_utilization: f32,
    /// Transmit airtime in percent
    #[prost(float, tag = "3")]
    pub air_util_tx: f32,
    /// Packets sent
    #[prost(uint32, tag = "4")]
    pub num_packets_tx: u32,
    /// Packets received
    #[prost(uint32, tag = "5")]
    pub num_packets_rx: u32,
    /// Packets received with errors
    #[prost(uint32, tag = "6")]
    pub num_packets_rx_bad: u32,
    /// Nodes heard in the last two hours
    #[prost(uint32, tag = "7")]
    pub num_online_nodes: u32,
    /// Nodes in the database
    #[prost(uint32, tag = "8")]
    pub num_total_nodes: u32,
    /// Duplicate packets received
    #[prost(uint32, tag = "9")]
    pub num_rx_dupe: u32,
    /// Packets relayed
    #[prost(uint32, tag = "10")]
    pub num_tx_relay: u32,
    /// Relays canceled
    #[prost(uint32, tag = "11")]
    pub num_tx_relay_canceled: u32,
}

/// Health sensor readings.
#[derive(Clone, PartialEq, ::prost::Message, Serialize)]
pub struct HealthMetrics {
    /// Heart rate in beats per minute
    #[prost(uint32, optional, tag = "1")]
    pub heart_bpm: Option<u32>,
    /// Blood oxygen saturation in percent
    #[prost(uint32, optional, tag = "2")]
    pub sp_o2: Option<u32>,
    /// Body temperature in degrees Celsius
    #[prost(float, optional, tag = "3")]
    pub temperature: Option<f32>,
}
