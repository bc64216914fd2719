//! ctrl_meas (0xF4) 和 config (0xF5) 寄存器的位域配置
//!
//! | 寄存器    | bit7..5 | bit4..2 | bit1..0 |
//! |-----------|---------|---------|---------|
//! | ctrl_meas | osrs_t  | osrs_p  | mode    |
//! | config    | t_sb    | filter  | -       |

use std::time::Duration;

/// 位域取值不在枚举范围内
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("无效的{field}取值: {value:#04b}")]
pub struct InvalidField {
    pub field: &'static str,
    pub value: u8,
}

/// 电源模式 mode[1:0]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerMode {
    /// 休眠，不测量
    Sleep,
    /// 测量一次后自动回到休眠
    Forced,
    /// 测量、待机循环进行
    Normal,
}

impl PowerMode {
    pub const fn bits(self) -> u8 {
        match self {
            PowerMode::Sleep => 0b00,
            PowerMode::Forced => 0b01,
            PowerMode::Normal => 0b11,
        }
    }
}

impl TryFrom<u8> for PowerMode {
    type Error = InvalidField;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0b00 => Ok(PowerMode::Sleep),
            // 01 和 10 都是强制模式
            0b01 | 0b10 => Ok(PowerMode::Forced),
            0b11 => Ok(PowerMode::Normal),
            _ => Err(InvalidField {
                field: "电源模式",
                value,
            }),
        }
    }
}

/// 过采样设置 (温度 osrs_t / 压力 osrs_p 共用)
///
/// | 变体    | 编码 | 分辨率   |
/// |---------|------|----------|
/// | Skipped | 000  | 不测量   |
/// | X1      | 001  | 16 bit   |
/// | X2      | 010  | 17 bit   |
/// | X4      | 011  | 18 bit   |
/// | X8      | 100  | 19 bit   |
/// | X16     | 101  | 20 bit   |
///
/// 跳过压力测量时压力寄存器保持 0x80000。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Oversampling {
    Skipped,
    X1,
    X2,
    X4,
    X8,
    X16,
}

impl Oversampling {
    pub const fn bits(self) -> u8 {
        match self {
            Oversampling::Skipped => 0b000,
            Oversampling::X1 => 0b001,
            Oversampling::X2 => 0b010,
            Oversampling::X4 => 0b011,
            Oversampling::X8 => 0b100,
            Oversampling::X16 => 0b101,
        }
    }

    /// 单次测量的采样次数
    pub const fn factor(self) -> u64 {
        match self {
            Oversampling::Skipped => 0,
            Oversampling::X1 => 1,
            Oversampling::X2 => 2,
            Oversampling::X4 => 4,
            Oversampling::X8 => 8,
            Oversampling::X16 => 16,
        }
    }

    /// ADC 有效位数，跳过时为 None
    pub const fn resolution_bits(self) -> Option<u8> {
        match self {
            Oversampling::Skipped => None,
            Oversampling::X1 => Some(16),
            Oversampling::X2 => Some(17),
            Oversampling::X4 => Some(18),
            Oversampling::X8 => Some(19),
            Oversampling::X16 => Some(20),
        }
    }
}

impl TryFrom<u8> for Oversampling {
    type Error = InvalidField;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0b000 => Ok(Oversampling::Skipped),
            0b001 => Ok(Oversampling::X1),
            0b010 => Ok(Oversampling::X2),
            0b011 => Ok(Oversampling::X4),
            0b100 => Ok(Oversampling::X8),
            // 101..111 芯片都按 x16 处理
            0b101..=0b111 => Ok(Oversampling::X16),
            _ => Err(InvalidField {
                field: "过采样",
                value,
            }),
        }
    }
}

/// IIR 滤波系数 filter[2:0]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filter {
    Off,
    X2,
    X4,
    X8,
    X16,
}

impl Filter {
    pub const fn bits(self) -> u8 {
        match self {
            Filter::Off => 0b000,
            Filter::X2 => 0b001,
            Filter::X4 => 0b010,
            Filter::X8 => 0b011,
            Filter::X16 => 0b100,
        }
    }
}

impl TryFrom<u8> for Filter {
    type Error = InvalidField;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0b000 => Ok(Filter::Off),
            0b001 => Ok(Filter::X2),
            0b010 => Ok(Filter::X4),
            0b011 => Ok(Filter::X8),
            0b100..=0b111 => Ok(Filter::X16),
            _ => Err(InvalidField {
                field: "滤波系数",
                value,
            }),
        }
    }
}

/// 正常模式下两次测量之间的待机时间 t_sb[2:0]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Standby {
    Ms0_5,
    Ms62_5,
    Ms125,
    Ms250,
    Ms500,
    Ms1000,
    Ms2000,
    Ms4000,
}

impl Standby {
    const ALL: [Standby; 8] = [
        Standby::Ms0_5,
        Standby::Ms62_5,
        Standby::Ms125,
        Standby::Ms250,
        Standby::Ms500,
        Standby::Ms1000,
        Standby::Ms2000,
        Standby::Ms4000,
    ];

    pub const fn bits(self) -> u8 {
        self as u8
    }

    pub const fn duration(self) -> Duration {
        match self {
            Standby::Ms0_5 => Duration::from_micros(500),
            Standby::Ms62_5 => Duration::from_micros(62_500),
            Standby::Ms125 => Duration::from_millis(125),
            Standby::Ms250 => Duration::from_millis(250),
            Standby::Ms500 => Duration::from_millis(500),
            Standby::Ms1000 => Duration::from_millis(1000),
            Standby::Ms2000 => Duration::from_millis(2000),
            Standby::Ms4000 => Duration::from_millis(4000),
        }
    }
}

impl TryFrom<u8> for Standby {
    type Error = InvalidField;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Standby::ALL.get(value as usize).copied().ok_or(InvalidField {
            field: "待机时间",
            value,
        })
    }
}

/// 传感器测量配置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    pub power_mode: PowerMode,
    pub temperature_oversampling: Oversampling,
    pub pressure_oversampling: Oversampling,
    pub filter: Filter,
    pub standby: Standby,
}

impl Default for Config {
    /// 正常模式，温度/压力均为20位，滤波 x16，待机 500ms
    fn default() -> Self {
        Self {
            power_mode: PowerMode::Normal,
            temperature_oversampling: Oversampling::X16,
            pressure_oversampling: Oversampling::X16,
            filter: Filter::X16,
            standby: Standby::Ms500,
        }
    }
}

impl Config {
    pub fn with_power_mode(mut self, power_mode: PowerMode) -> Self {
        self.power_mode = power_mode;
        self
    }

    pub fn with_oversampling(mut self, temperature: Oversampling, pressure: Oversampling) -> Self {
        self.temperature_oversampling = temperature;
        self.pressure_oversampling = pressure;
        self
    }

    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_standby(mut self, standby: Standby) -> Self {
        self.standby = standby;
        self
    }

    /// ctrl_meas (0xF4) 寄存器值
    pub const fn ctrl_meas(&self) -> u8 {
        (self.temperature_oversampling.bits() << 5)
            | (self.pressure_oversampling.bits() << 2)
            | self.power_mode.bits()
    }

    /// config (0xF5) 寄存器值，spi3w_en 保持为0
    pub const fn config(&self) -> u8 {
        (self.standby.bits() << 5) | (self.filter.bits() << 2)
    }

    /// 一次完整测量的最长耗时
    ///
    /// t = 1.25ms + 2.3ms * osrs_t + (2.3ms * osrs_p + 0.575ms)
    pub fn max_measurement_time(&self) -> Duration {
        let temperature = 2300 * self.temperature_oversampling.factor();
        let pressure = match self.pressure_oversampling {
            Oversampling::Skipped => 0,
            oversampling => 2300 * oversampling.factor() + 575,
        };
        Duration::from_micros(1250 + temperature + pressure)
    }

    /// 由读回的两个寄存器值还原配置
    pub fn from_registers(ctrl_meas: u8, config: u8) -> Result<Self, InvalidField> {
        Ok(Self {
            power_mode: PowerMode::try_from(ctrl_meas & 0b11)?,
            temperature_oversampling: Oversampling::try_from(ctrl_meas >> 5)?,
            pressure_oversampling: Oversampling::try_from((ctrl_meas >> 2) & 0b111)?,
            filter: Filter::try_from((config >> 2) & 0b111)?,
            standby: Standby::try_from(config >> 5)?,
        })
    }
}
