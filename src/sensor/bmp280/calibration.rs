use super::registers::{CALIBRATION_LEN, decode_s16_le, decode_u16_le};

/// BMP280传感器校准参数结构体
///
/// 出厂时写入 NVM 的温度/压力补偿系数，地址 0x88-0x9F，共24字节，
/// 每个参数为小端序16位。读取一次后在整个会话中保持不变。
///
/// # 存储分布
/// | 参数    | 地址      | 类型 |
/// |---------|-----------|------|
/// | dig_T1  | 0x88/0x89 | u16  |
/// | dig_T2  | 0x8A/0x8B | i16  |
/// | dig_T3  | 0x8C/0x8D | i16  |
/// | dig_P1  | 0x8E/0x8F | u16  |
/// | dig_P2..dig_P9 | 0x90-0x9F | i16 |
///
/// 这里不对参数做任何合理性校验；`dig_P1 == 0` 的校准数据会在压力补偿时
/// 以 [`DegenerateCalibration`](super::compensation::DegenerateCalibration) 的形式暴露出来。
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Calibration {
    /// 温度校准系数 1 - 基准偏移量 (典型值 27500-28000)
    pub dig_t1: u16,
    /// 温度校准系数 2 - 一阶灵敏度系数
    pub dig_t2: i16,
    /// 温度校准系数 3 - 二阶非线性系数
    pub dig_t3: i16,

    /// 压力校准系数 1 - 基准缩放系数，为0时压力补偿无法进行
    pub dig_p1: u16,
    /// 压力校准系数 2 - 一阶温度补偿系数
    pub dig_p2: i16,
    /// 压力校准系数 3 - 二阶温度补偿系数
    pub dig_p3: i16,
    /// 压力校准系数 4 - 偏移量
    pub dig_p4: i16,
    /// 压力校准系数 5 - 温度漂移补偿系数
    pub dig_p5: i16,
    /// 压力校准系数 6 - 非线性校正系数
    pub dig_p6: i16,
    /// 压力校准系数 7 - 零点偏移补偿系数
    pub dig_p7: i16,
    /// 压力校准系数 8
    pub dig_p8: i16,
    /// 压力校准系数 9
    pub dig_p9: i16,
}

impl Calibration {
    /// 解析从 0x88 开始连续读取的24字节校准数据
    pub fn from_bytes(data: &[u8; CALIBRATION_LEN]) -> Self {
        // 取出指定偏移处的两个字节
        let word = |offset: usize| [data[offset], data[offset + 1]];

        Self {
            dig_t1: decode_u16_le(word(0)),
            dig_t2: decode_s16_le(word(2)),
            dig_t3: decode_s16_le(word(4)),
            dig_p1: decode_u16_le(word(6)),
            dig_p2: decode_s16_le(word(8)),
            dig_p3: decode_s16_le(word(10)),
            dig_p4: decode_s16_le(word(12)),
            dig_p5: decode_s16_le(word(14)),
            dig_p6: decode_s16_le(word(16)),
            dig_p7: decode_s16_le(word(18)),
            dig_p8: decode_s16_le(word(20)),
            dig_p9: decode_s16_le(word(22)),
        }
    }

    /// 压力系数 dig_P1..dig_P9，按顺序排列
    pub fn pressure_coefficients(&self) -> [i32; 9] {
        [
            self.dig_p1 as i32,
            self.dig_p2 as i32,
            self.dig_p3 as i32,
            self.dig_p4 as i32,
            self.dig_p5 as i32,
            self.dig_p6 as i32,
            self.dig_p7 as i32,
            self.dig_p8 as i32,
            self.dig_p9 as i32,
        ]
    }
}
