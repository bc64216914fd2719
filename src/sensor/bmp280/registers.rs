//! BMP280 寄存器地址表以及寄存器字节的解码函数

/// BMP280 默认I2C从设备地址 (SDO接GND)
pub const DEFAULT_ADDRESS: u8 = 0x76;
/// BMP280 备用I2C从设备地址 (SDO接VDDIO)
pub const ALTERNATE_ADDRESS: u8 = 0x77;

/// 芯片ID寄存器的固定值
pub const CHIP_ID: u8 = 0x58;
/// 写入软复位寄存器后触发完整的上电复位流程
pub const SOFT_RESET_COMMAND: u8 = 0xB6;

/// 温度/压力校准参数长度 (0x88-0x9F)
pub const CALIBRATION_LEN: usize = 24;
/// 压力+温度原始数据长度 (0xF7-0xFC)
pub const DATA_LEN: usize = 6;

/// 状态寄存器: 正在转换
pub const STATUS_MEASURING: u8 = 0b0000_1000;
/// 状态寄存器: NVM数据正在复制到映像寄存器
pub const STATUS_IM_UPDATE: u8 = 0b0000_0001;

/// BMP280 寄存器地址
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Register {
    /// 校准参数起始地址 (dig_T1)
    CalibStart = 0x88,
    ChipId = 0xD0,
    Version = 0xD1,
    SoftReset = 0xE0,
    /// bit3: measuring, bit0: im_update
    Status = 0xF3,
    /// osrs_t[7:5] osrs_p[4:2] mode[1:0]
    CtrlMeas = 0xF4,
    /// t_sb[7:5] filter[4:2] spi3w_en[0]
    Config = 0xF5,
    PressMsb = 0xF7,
    PressLsb = 0xF8,
    PressXlsb = 0xF9,
    TempMsb = 0xFA,
    TempLsb = 0xFB,
    TempXlsb = 0xFC,
}

impl Register {
    /// 寄存器地址
    pub const fn addr(self) -> u8 {
        self as u8
    }
}

/// 小端序无符号16位解码
pub fn decode_u16_le(bytes: [u8; 2]) -> u16 {
    u16::from_le_bytes(bytes)
}

/// 小端序有符号16位解码 (高字节>=0x80时为负数)
pub fn decode_s16_le(bytes: [u8; 2]) -> i16 {
    i16::from_le_bytes(bytes)
}

/// 由 MSB、LSB、XLSB 三个字节拼接20位ADC原始值
///
/// XLSB 只有高4位有效，低4位直接丢弃。低分辨率采样模式下多出的低位在
/// 寄存器中本身就是0，这里不做修正。
pub fn decode_raw_sample(msb: u8, lsb: u8, xlsb: u8) -> u32 {
    ((msb as u32) << 12) | ((lsb as u32) << 4) | ((xlsb as u32) >> 4)
}

/// 一次采样的原始ADC数据
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawSample {
    /// 20位温度原始值 (0xFA-0xFC)
    pub temperature: u32,
    /// 20位压力原始值 (0xF7-0xF9)
    pub pressure: u32,
}

impl RawSample {
    /// 解析从 0xF7 开始连续读取的6个字节
    ///
    /// 物理顺序为: 压力 MSB/LSB/XLSB，然后温度 MSB/LSB/XLSB
    pub fn from_data_block(data: [u8; DATA_LEN]) -> Self {
        Self {
            pressure: decode_raw_sample(data[0], data[1], data[2]),
            temperature: decode_raw_sample(data[3], data[4], data[5]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_unsigned_words() {
        assert_eq!(decode_u16_le([0x70, 0x6B]), 27504);
        assert_eq!(decode_u16_le([0x00, 0x00]), 0);
        assert_eq!(decode_u16_le([0xFF, 0xFF]), u16::MAX);
        for (lo, hi) in [(0x12u8, 0x34u8), (0x80, 0x00), (0x01, 0x80)] {
            assert_eq!(decode_u16_le([lo, hi]), lo as u16 | ((hi as u16) << 8));
        }
    }

    #[test]
    fn decodes_signed_words_with_sign_extension() {
        assert_eq!(decode_s16_le([0x43, 0x67]), 26435);
        assert_eq!(decode_s16_le([0x18, 0xFC]), -1000);
        assert_eq!(decode_s16_le([0x00, 0x80]), i16::MIN);
        assert_eq!(decode_s16_le([0xFF, 0x7F]), i16::MAX);
        assert_eq!(decode_s16_le([0xFF, 0xFF]), -1);
    }

    #[test]
    fn rebuilds_20_bit_samples() {
        assert_eq!(decode_raw_sample(0xFF, 0xFF, 0xF0), 0xFFFFF);
        assert_eq!(decode_raw_sample(0x00, 0x00, 0x0F), 0);
        assert_eq!(decode_raw_sample(0x7E, 0xED, 0x00), 519888);
        assert_eq!(decode_raw_sample(0x65, 0x5A, 0xC0), 415148);
    }

    #[test]
    fn splits_data_block_pressure_first() {
        let sample = RawSample::from_data_block([0x65, 0x5A, 0xC0, 0x7E, 0xED, 0x0F]);
        assert_eq!(sample.pressure, 415148);
        assert_eq!(sample.temperature, 519888);
    }
}
