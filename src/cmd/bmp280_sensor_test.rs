use std::{thread, time::Duration};

use anyhow::Context;
use raspi_bmp280::sensor::bmp280::Driver;
use raspi_bmp280::sensor::bmp280::compensation::{DegenerateCalibration, Measurement, Pressure};
use raspi_bmp280::sensor::bmp280::config::Config;
use raspi_bmp280::sensor::bmp280::registers::{ALTERNATE_ADDRESS, DEFAULT_ADDRESS};
use raspi_bmp280::std_clock::StdClock;
use rppal::i2c::I2c;
use serde::Serialize;

/// 默认采样次数
const SAMPLE_COUNT: usize = 20;
/// 默认采样间隔
const SAMPLE_INTERVAL_MS: u64 = 500;

/// 命令行参数
#[derive(Debug, PartialEq)]
struct Args {
    /// 初始化时是否软复位
    soft_reset: bool,
    /// I2C从设备地址
    address: u8,
    /// 采样次数
    count: usize,
    /// 采样间隔
    interval: Duration,
}

impl Default for Args {
    fn default() -> Self {
        Self {
            soft_reset: true,
            address: DEFAULT_ADDRESS,
            count: SAMPLE_COUNT,
            interval: Duration::from_millis(SAMPLE_INTERVAL_MS),
        }
    }
}

impl Args {
    /// 解析命令行参数
    ///
    /// - `--noReset`: 不对传感器软复位 (不区分大小写)
    /// - `--address <0x76|0x77>`
    /// - `--count <n>`
    /// - `--interval <ms>`
    fn parse<I: IntoIterator<Item = String>>(args: I) -> anyhow::Result<Self> {
        let mut parsed = Self::default();
        let mut args = args.into_iter();

        while let Some(arg) = args.next() {
            let mut value = |name: &str| {
                args.next()
                    .ok_or_else(|| anyhow::anyhow!("参数 {} 缺少取值", name))
            };
            match arg.to_ascii_lowercase().as_str() {
                "--noreset" => {
                    eprintln!("Option : --noReset : 不对传感器软复位");
                    parsed.soft_reset = false;
                }
                "--address" => {
                    let text = value("--address")?;
                    let digits = text.trim_start_matches("0x").trim_start_matches("0X");
                    parsed.address = u8::from_str_radix(digits, 16)
                        .with_context(|| format!("无效的I2C地址: {}", text))?;
                    if ![DEFAULT_ADDRESS, ALTERNATE_ADDRESS].contains(&parsed.address) {
                        return Err(anyhow::anyhow!(
                            "BMP280 地址只能是 {:#04x} 或 {:#04x}",
                            DEFAULT_ADDRESS,
                            ALTERNATE_ADDRESS
                        ));
                    }
                }
                "--count" => {
                    parsed.count = value("--count")?.parse().context("无效的采样次数")?;
                }
                "--interval" => {
                    let millis: u64 = value("--interval")?.parse().context("无效的采样间隔")?;
                    parsed.interval = Duration::from_millis(millis);
                }
                other => return Err(anyhow::anyhow!("未知参数: {}", other)),
            }
        }

        // OK
        Ok(parsed)
    }
}

/// 按小数位数四舍五入
fn round_to(value: f64, digits: i32) -> f64 {
    let scale = 10_f64.powi(digits);
    (value * scale).round() / scale
}

/// 压力换算为百帕并保留1位小数，补偿失败时为 None
fn hectopascals<P: Pressure>(pressure: Result<P, DegenerateCalibration>) -> Option<f64> {
    match pressure {
        Ok(pressure) => Some(round_to(pressure.hectopascals(), 1)),
        Err(_) => None,
    }
}

/// 一次采样的输出 (℃ / hPa)
#[derive(Debug, PartialEq, Serialize)]
struct Report {
    temperature: f64,
    #[serde(rename = "Pressure64")]
    pressure_64: Option<f64>,
    #[serde(rename = "Pressure32")]
    pressure_32: Option<f64>,
    #[serde(rename = "PressureDouble")]
    pressure_double: Option<f64>,
}

impl From<&Measurement> for Report {
    fn from(measurement: &Measurement) -> Self {
        Self {
            temperature: round_to(measurement.temperature.celsius(), 2),
            pressure_64: hectopascals(measurement.pressure_fixed64),
            pressure_32: hectopascals(measurement.pressure_fixed32),
            pressure_double: hectopascals(measurement.pressure_float),
        }
    }
}

/// BMP280传感器测试程序
fn main() -> anyhow::Result<()> {
    // 解析命令行参数
    let args = Args::parse(std::env::args().skip(1))?;
    // 初始化全局时钟
    let clock = StdClock::new();
    // 初始化I2C通信总线 (/dev/i2c-1)
    let mut i2c_bus = I2c::new().context("打开I2C总线失败")?;

    // 创建BMP280传感器实例
    let driver = Driver::with_config(
        &clock,
        &mut i2c_bus,
        Some(args.address),
        Config::default(),
        args.soft_reset,
    );
    eprintln!(
        "BMP280 地址: {:#04x}, 初始化结果: {}",
        args.address,
        match &driver {
            Ok(_) => "OK".to_string(),
            Err(err) => err.to_string(),
        }
    );
    let driver = driver?;

    // 打印校准参数
    let calib = driver.calibration();
    eprintln!(
        "T1={}\tT2={}\tT3={}",
        calib.dig_t1, calib.dig_t2, calib.dig_t3
    );
    let coefficients = calib
        .pressure_coefficients()
        .iter()
        .enumerate()
        .map(|(index, value)| format!("P{}={}", index + 1, value))
        .collect::<Vec<_>>()
        .join("\t");
    eprintln!("{}", coefficients);

    // 按指定次数读取传感器数据
    for _ in 0..args.count {
        match driver.read(&mut i2c_bus) {
            // 读取成功
            Ok(measurement) => {
                eprintln!(
                    "adc_Temperature={}\tadc_Pressure={}",
                    measurement.raw.temperature, measurement.raw.pressure
                );
                println!("{}", serde_json::to_string(&Report::from(&measurement))?);
            }
            // 读取失败
            Err(err) => {
                eprintln!("❌ 读取BMP280传感器数据失败: {}", err);
            }
        }

        thread::sleep(args.interval);
    }

    // OK
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use raspi_bmp280::sensor::bmp280::calibration::Calibration;
    use raspi_bmp280::sensor::bmp280::registers::RawSample;

    fn args(list: &[&str]) -> anyhow::Result<Args> {
        Args::parse(list.iter().map(|arg| arg.to_string()))
    }

    #[test]
    fn parses_defaults_and_flags() {
        assert_eq!(args(&[]).unwrap(), Args::default());

        let parsed = args(&[
            "--NORESET",
            "--address",
            "0x77",
            "--count",
            "3",
            "--interval",
            "10",
        ])
        .unwrap();
        assert_eq!(
            parsed,
            Args {
                soft_reset: false,
                address: 0x77,
                count: 3,
                interval: Duration::from_millis(10),
            }
        );
    }

    #[test]
    fn rejects_bad_arguments() {
        assert!(args(&["--address"]).is_err());
        assert!(args(&["--address", "0xZZ"]).is_err());
        assert!(args(&["--address", "0x40"]).is_err());
        assert!(args(&["--count", "-1"]).is_err());
        assert!(args(&["--verbose"]).is_err());
    }

    #[test]
    fn serializes_report_as_json_line() {
        let calib = Calibration {
            dig_t1: 27504,
            dig_t2: 26435,
            dig_t3: -1000,
            dig_p1: 36477,
            dig_p2: -10685,
            dig_p3: 3024,
            dig_p4: 2855,
            dig_p5: 140,
            dig_p6: -7,
            dig_p7: 15500,
            dig_p8: -14600,
            dig_p9: 6000,
        };
        let sample = RawSample {
            temperature: 519888,
            pressure: 415148,
        };

        let measurement = Measurement::compensate(sample, &calib);
        assert_eq!(
            Report::from(&measurement),
            Report {
                temperature: 25.08,
                pressure_64: Some(1006.5),
                pressure_32: Some(1006.6),
                pressure_double: Some(1006.5),
            }
        );
        assert_eq!(
            serde_json::to_string(&Report::from(&measurement)).unwrap(),
            r#"{"temperature":25.08,"Pressure64":1006.5,"Pressure32":1006.6,"PressureDouble":1006.5}"#
        );

        let degenerate = Calibration { dig_p1: 0, ..calib };
        let measurement = Measurement::compensate(sample, &degenerate);
        assert_eq!(
            serde_json::to_string(&Report::from(&measurement)).unwrap(),
            r#"{"temperature":25.08,"Pressure64":null,"Pressure32":null,"PressureDouble":null}"#
        );
    }
}
