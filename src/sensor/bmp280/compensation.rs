//! BMP280 温度/压力补偿算法
//!
//! 根据数据手册 3.11.3 节和附录 8 的补偿公式，把原始ADC值换算成物理量。
//! 温度补偿额外产出一个 [`FineTemperature`]，三种压力补偿实现都需要它作为输入。
//!
//! 这里的函数都是纯函数：没有全局状态，不做输入校验，任意输入都不会 panic。
//! 整数运算按照数据手册参考实现的位宽进行，溢出时按补码回绕。

use std::fmt;

use super::calibration::Calibration;
use super::registers::RawSample;

/// 温度补偿产生的中间值 t_fine
///
/// 只对产生它的那一次采样有效，必须原样传给同一次采样的压力补偿。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FineTemperature(i32);

impl FineTemperature {
    pub const fn new(value: i32) -> Self {
        Self(value)
    }

    pub const fn value(self) -> i32 {
        self.0
    }
}

/// 补偿后的温度，单位 0.01°C (5123 表示 51.23°C)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Temperature(i32);

impl Temperature {
    pub const fn hundredths(self) -> i32 {
        self.0
    }

    /// 换算为摄氏度
    pub fn celsius(self) -> f64 {
        self.0 as f64 / 100.0
    }
}

impl fmt::Display for Temperature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}℃", self.celsius())
    }
}

/// 压力值的统一访问方式
pub trait Pressure: Copy + fmt::Debug {
    /// 换算为帕斯卡
    fn pascals(&self) -> f64;

    /// 换算为百帕
    fn hectopascals(&self) -> f64 {
        self.pascals() / 100.0
    }
}

/// Q24.8 定点格式的压力值 (24位整数 + 8位小数)，除以256得到Pa
///
/// 例如 24674867 表示 24674867/256 = 96386.2 Pa
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PressureQ24_8(u32);

impl PressureQ24_8 {
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl Pressure for PressureQ24_8 {
    fn pascals(&self) -> f64 {
        self.0 as f64 / 256.0
    }
}

/// 整数帕斯卡压力值 (无小数位)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PressurePa(u32);

impl PressurePa {
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl Pressure for PressurePa {
    fn pascals(&self) -> f64 {
        self.0 as f64
    }
}

/// 双精度浮点帕斯卡压力值
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct PressureF64(f64);

impl Pressure for PressureF64 {
    fn pascals(&self) -> f64 {
        self.0
    }
}

/// 校准参数无法用于压力补偿 (公式中的除数 var1 为0)
///
/// 参考实现在这种情况下返回0，这里单独作为一个结果返回，避免和
/// 真实的0帕读数混淆。是否重试由调用方决定。
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("压力补偿除数为0，校准参数不可用")]
pub struct DegenerateCalibration;

/// 整数温度补偿
///
/// ## 参数
/// - `adc_t`: 寄存器 0xFA-0xFC 的20位温度原始值
///
/// ## 返回
/// - 温度 (0.01°C) 和同一次采样压力补偿所需的 t_fine
pub fn compensate_temperature(adc_t: u32, calib: &Calibration) -> (Temperature, FineTemperature) {
    // 温度补偿在32位有符号整型下进行
    let adc_t = adc_t as i32;
    let dig_t1 = calib.dig_t1 as i32;
    let dig_t2 = calib.dig_t2 as i32;
    let dig_t3 = calib.dig_t3 as i32;

    let var1 = ((adc_t >> 3).wrapping_sub(dig_t1 << 1)).wrapping_mul(dig_t2) >> 11;
    let delta = (adc_t >> 4).wrapping_sub(dig_t1);
    let var2 = ((delta.wrapping_mul(delta) >> 12).wrapping_mul(dig_t3)) >> 14;

    let t_fine = var1.wrapping_add(var2);
    let temperature = t_fine.wrapping_mul(5).wrapping_add(128) >> 8;

    (Temperature(temperature), FineTemperature(t_fine))
}

/// 浮点温度补偿，返回摄氏度
///
/// 只用于校验整数实现，压力补偿仍然使用 [`compensate_temperature`] 的 t_fine。
pub fn compensate_temperature_float(adc_t: u32, calib: &Calibration) -> f64 {
    let adc_t = adc_t as f64;
    let dig_t1 = calib.dig_t1 as f64;

    let var1 = (adc_t / 16384.0 - dig_t1 / 1024.0) * calib.dig_t2 as f64;
    let delta = adc_t / 131072.0 - dig_t1 / 8192.0;
    let var2 = delta * delta * calib.dig_t3 as f64;

    (var1 + var2) / 5120.0
}

/// 压力补偿算法
///
/// 三种实现的输入完全相同，结果在舍入误差内一致，调用方可以任选其一
/// 或者同时运行几种做交叉校验。
pub trait PressureCompensator {
    type Output: Pressure;

    /// 算法名称
    fn name(&self) -> &'static str;

    /// ## 参数
    /// - `adc_p`: 寄存器 0xF7-0xF9 的20位压力原始值
    /// - `t_fine`: 同一次采样温度补偿得到的中间值
    fn compensate(
        &self,
        adc_p: u32,
        t_fine: FineTemperature,
        calib: &Calibration,
    ) -> Result<Self::Output, DegenerateCalibration>;
}

/// 64位整数压力补偿，输出 Q24.8 定点帕斯卡
#[derive(Debug, Default, Clone, Copy)]
pub struct Fixed64;

impl PressureCompensator for Fixed64 {
    type Output = PressureQ24_8;

    fn name(&self) -> &'static str {
        "Pressure64"
    }

    fn compensate(
        &self,
        adc_p: u32,
        t_fine: FineTemperature,
        calib: &Calibration,
    ) -> Result<PressureQ24_8, DegenerateCalibration> {
        // 压力补偿在64位有符号整型下进行
        let dig_p1 = calib.dig_p1 as i64;
        let dig_p2 = calib.dig_p2 as i64;
        let dig_p3 = calib.dig_p3 as i64;
        let dig_p4 = calib.dig_p4 as i64;
        let dig_p5 = calib.dig_p5 as i64;
        let dig_p6 = calib.dig_p6 as i64;
        let dig_p7 = calib.dig_p7 as i64;
        let dig_p8 = calib.dig_p8 as i64;
        let dig_p9 = calib.dig_p9 as i64;

        let mut var1 = t_fine.value() as i64 - 128000;
        let mut var2 = var1.wrapping_mul(var1).wrapping_mul(dig_p6);
        var2 = var2.wrapping_add(var1.wrapping_mul(dig_p5) << 17);
        var2 = var2.wrapping_add(dig_p4 << 35);
        var1 = (var1.wrapping_mul(var1).wrapping_mul(dig_p3) >> 8)
            .wrapping_add(var1.wrapping_mul(dig_p2) << 12);
        var1 = (1_i64 << 47).wrapping_add(var1).wrapping_mul(dig_p1) >> 33;

        if var1 == 0 {
            return Err(DegenerateCalibration);
        }

        let mut p = 1_048_576 - adc_p as i64;
        p = (p << 31)
            .wrapping_sub(var2)
            .wrapping_mul(3125)
            .wrapping_div(var1);
        var1 = dig_p9.wrapping_mul(p >> 13).wrapping_mul(p >> 13) >> 25;
        var2 = dig_p8.wrapping_mul(p) >> 19;
        p = (p.wrapping_add(var1).wrapping_add(var2) >> 8).wrapping_add(dig_p7 << 4);

        Ok(PressureQ24_8(p as u32))
    }
}

/// 32位整数压力补偿，输出整数帕斯卡
#[derive(Debug, Default, Clone, Copy)]
pub struct Fixed32;

impl PressureCompensator for Fixed32 {
    type Output = PressurePa;

    fn name(&self) -> &'static str {
        "Pressure32"
    }

    fn compensate(
        &self,
        adc_p: u32,
        t_fine: FineTemperature,
        calib: &Calibration,
    ) -> Result<PressurePa, DegenerateCalibration> {
        let dig_p1 = calib.dig_p1 as i32;
        let dig_p2 = calib.dig_p2 as i32;
        let dig_p3 = calib.dig_p3 as i32;
        let dig_p4 = calib.dig_p4 as i32;
        let dig_p5 = calib.dig_p5 as i32;
        let dig_p6 = calib.dig_p6 as i32;
        let dig_p7 = calib.dig_p7 as i32;
        let dig_p8 = calib.dig_p8 as i32;
        let dig_p9 = calib.dig_p9 as i32;

        let mut var1 = (t_fine.value() >> 1) - 64000;
        let quarter = var1 >> 2;
        let mut var2 = (quarter.wrapping_mul(quarter) >> 11).wrapping_mul(dig_p6);
        var2 = var2.wrapping_add(var1.wrapping_mul(dig_p5) << 1);
        var2 = (var2 >> 2).wrapping_add(dig_p4 << 16);
        var1 = ((dig_p3.wrapping_mul(quarter.wrapping_mul(quarter) >> 13) >> 3)
            .wrapping_add(dig_p2.wrapping_mul(var1) >> 1))
            >> 18;
        var1 = 32768_i32.wrapping_add(var1).wrapping_mul(dig_p1) >> 15;

        if var1 == 0 {
            return Err(DegenerateCalibration);
        }

        // 以下为无符号运算
        let divisor = var1 as u32;
        let mut p = (1_048_576_i32.wrapping_sub(adc_p as i32) as u32)
            .wrapping_sub((var2 >> 12) as u32)
            .wrapping_mul(3125);
        // 最高位为1时 p << 1 会溢出，先除后乘
        p = if p < 0x8000_0000 {
            (p << 1) / divisor
        } else {
            (p / divisor).wrapping_mul(2)
        };

        var1 = dig_p9.wrapping_mul(((p >> 3).wrapping_mul(p >> 3) >> 13) as i32) >> 12;
        var2 = ((p >> 2) as i32).wrapping_mul(dig_p8) >> 13;
        p = (p as i32).wrapping_add(var1.wrapping_add(var2).wrapping_add(dig_p7) >> 4) as u32;

        Ok(PressurePa(p))
    }
}

/// 双精度浮点压力补偿
#[derive(Debug, Default, Clone, Copy)]
pub struct FloatingPoint;

impl PressureCompensator for FloatingPoint {
    type Output = PressureF64;

    fn name(&self) -> &'static str {
        "PressureDouble"
    }

    fn compensate(
        &self,
        adc_p: u32,
        t_fine: FineTemperature,
        calib: &Calibration,
    ) -> Result<PressureF64, DegenerateCalibration> {
        let dig_p1 = calib.dig_p1 as f64;
        let dig_p2 = calib.dig_p2 as f64;
        let dig_p3 = calib.dig_p3 as f64;
        let dig_p4 = calib.dig_p4 as f64;
        let dig_p5 = calib.dig_p5 as f64;
        let dig_p6 = calib.dig_p6 as f64;
        let dig_p7 = calib.dig_p7 as f64;
        let dig_p8 = calib.dig_p8 as f64;
        let dig_p9 = calib.dig_p9 as f64;

        let mut var1 = t_fine.value() as f64 / 2.0 - 64000.0;
        let mut var2 = var1 * var1 * dig_p6 / 32768.0;
        var2 += var1 * dig_p5 * 2.0;
        var2 = var2 / 4.0 + dig_p4 * 65536.0;
        var1 = (dig_p3 * var1 * var1 / 524288.0 + dig_p2 * var1) / 524288.0;
        var1 = (1.0 + var1 / 32768.0) * dig_p1;

        if var1 == 0.0 {
            return Err(DegenerateCalibration);
        }

        let mut p = 1_048_576.0 - adc_p as f64;
        p = (p - var2 / 4096.0) * 6250.0 / var1;
        var1 = dig_p9 * p * p / 2_147_483_648.0;
        var2 = p * dig_p8 / 32768.0;
        p += (var1 + var2 + dig_p7) / 16.0;

        Ok(PressureF64(p))
    }
}

/// 64位整数压力补偿，见 [`Fixed64`]
pub fn compensate_pressure_fixed64(
    adc_p: u32,
    t_fine: FineTemperature,
    calib: &Calibration,
) -> Result<PressureQ24_8, DegenerateCalibration> {
    Fixed64.compensate(adc_p, t_fine, calib)
}

/// 32位整数压力补偿，见 [`Fixed32`]
pub fn compensate_pressure_fixed32(
    adc_p: u32,
    t_fine: FineTemperature,
    calib: &Calibration,
) -> Result<PressurePa, DegenerateCalibration> {
    Fixed32.compensate(adc_p, t_fine, calib)
}

/// 浮点压力补偿，见 [`FloatingPoint`]
pub fn compensate_pressure_float(
    adc_p: u32,
    t_fine: FineTemperature,
    calib: &Calibration,
) -> Result<PressureF64, DegenerateCalibration> {
    FloatingPoint.compensate(adc_p, t_fine, calib)
}

/// 一次采样的完整补偿结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurement {
    /// 补偿前的原始ADC值
    pub raw: RawSample,
    pub temperature: Temperature,
    pub t_fine: FineTemperature,
    pub pressure_fixed64: Result<PressureQ24_8, DegenerateCalibration>,
    pub pressure_fixed32: Result<PressurePa, DegenerateCalibration>,
    pub pressure_float: Result<PressureF64, DegenerateCalibration>,
}

impl Measurement {
    /// 对一次原始采样运行温度补偿和全部三种压力补偿
    pub fn compensate(sample: RawSample, calib: &Calibration) -> Self {
        let (temperature, t_fine) = compensate_temperature(sample.temperature, calib);

        Self {
            raw: sample,
            temperature,
            t_fine,
            pressure_fixed64: compensate_pressure_fixed64(sample.pressure, t_fine, calib),
            pressure_fixed32: compensate_pressure_fixed32(sample.pressure, t_fine, calib),
            pressure_float: compensate_pressure_float(sample.pressure, t_fine, calib),
        }
    }
}
