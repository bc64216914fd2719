pub mod calibration;
pub mod compensation;
pub mod config;
pub mod registers;

use std::thread;
use std::time::Duration;

use embedded_hal::i2c::{ErrorKind, I2c};
use embedded_timers::clock::Clock;
use log::{debug, info, warn};

use calibration::Calibration;
use compensation::Measurement;
use config::{Config, InvalidField, PowerMode};
use registers::{
    CALIBRATION_LEN, CHIP_ID, DATA_LEN, DEFAULT_ADDRESS, RawSample, Register, SOFT_RESET_COMMAND,
    STATUS_IM_UPDATE, STATUS_MEASURING,
};

/// 上电/软复位后至少等待2ms才能访问寄存器
const STARTUP_DELAY: Duration = Duration::from_millis(2);
/// 软复位后等待 NVM 数据复制完成的最长时间
const RESET_TIMEOUT: Duration = Duration::from_millis(50);
/// 轮询状态寄存器的间隔
const POLL_INTERVAL: Duration = Duration::from_millis(1);

/// BMP280 驱动错误
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Bmp280Error {
    /// I2C 通信失败 (总线不可用、NACK 等)
    #[error("I2C通信失败: {0:?}")]
    Bus(ErrorKind),
    /// 0xD0 读到的不是 BMP280 的芯片ID
    #[error("芯片ID不匹配: 期望 0x58, 读取到 {0:#04x}")]
    ChipIdMismatch(u8),
    /// 软复位后 im_update 一直未清零
    #[error("等待传感器复制校准数据超时")]
    ResetTimeout,
    #[error(transparent)]
    InvalidConfig(#[from] InvalidField),
}

fn bus_error<E: embedded_hal::i2c::Error>(err: E) -> Bmp280Error {
    Bmp280Error::Bus(err.kind())
}

/// 状态寄存器 (0xF3)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Status {
    /// bit3: 正在转换，结果写入数据寄存器后清零
    pub measuring: bool,
    /// bit0: NVM 数据正在复制到映像寄存器
    pub im_update: bool,
}

impl From<u8> for Status {
    fn from(data: u8) -> Self {
        Self {
            measuring: data & STATUS_MEASURING != 0,
            im_update: data & STATUS_IM_UPDATE != 0,
        }
    }
}

/// BMP280 大气压力、温度传感器驱动
///
/// 驱动只保存从设备地址、测量配置和校准参数，I2C 总线在每次调用时借用，
/// 因此多个传感器可以共用一条总线，各自持有独立的校准参数。
#[derive(Debug, Clone)]
pub struct Driver {
    /// I2C从设备地址
    /// - SDO接GND: 0x76
    /// - SDO接VDDIO: 0x77
    address: u8,
    /// 测量配置
    config: Config,
    /// 校准参数
    calibration: Calibration,
}

impl Driver {
    /// 使用默认配置创建传感器实例，并执行软复位
    pub fn new<C, I>(clock: &C, i2c: &mut I, address: Option<u8>) -> Result<Self, Bmp280Error>
    where
        C: Clock,
        I: I2c,
    {
        Self::with_config(clock, i2c, address, Config::default(), true)
    }

    /// 创建传感器实例
    ///
    /// 1. 检查芯片ID (0xD0 == 0x58)
    /// 2. 可选软复位，并等待校准数据复制完成
    /// 3. 写入 config / ctrl_meas
    /// 4. 读取校准参数
    pub fn with_config<C, I>(
        clock: &C,
        i2c: &mut I,
        address: Option<u8>,
        config: Config,
        soft_reset: bool,
    ) -> Result<Self, Bmp280Error>
    where
        C: Clock,
        I: I2c,
    {
        let mut sensor = Self {
            address: address.unwrap_or(DEFAULT_ADDRESS),
            config,
            calibration: Calibration::default(),
        };

        // 检查芯片ID
        let chip_id = sensor.read_chip_id(i2c)?;
        if chip_id != CHIP_ID {
            warn!("{:#04x}处的设备芯片ID为{:#04x}", sensor.address, chip_id);
            return Err(Bmp280Error::ChipIdMismatch(chip_id));
        }

        if soft_reset {
            sensor.soft_reset(clock, i2c)?;
        }
        sensor.apply_config(i2c)?;
        sensor.calibration = sensor.read_calibration(i2c)?;

        info!(
            "BMP280 {:#04x} 初始化完成: ctrl_meas={:#04x} config={:#04x}",
            sensor.address,
            config.ctrl_meas(),
            config.config()
        );
        debug!(
            "分辨率: 温度{:?}位 压力{:?}位, 待机时间{:?}",
            config.temperature_oversampling.resolution_bits(),
            config.pressure_oversampling.resolution_bits(),
            config.standby.duration()
        );
        debug!("校准参数: {:?}", sensor.calibration);

        // 正常模式下等待第一次测量完成
        if config.power_mode == PowerMode::Normal {
            thread::sleep(config.max_measurement_time());
        }

        // OK
        Ok(sensor)
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn calibration(&self) -> &Calibration {
        &self.calibration
    }

    /// 读取单个寄存器
    fn read_register<I: I2c>(&self, i2c: &mut I, register: Register) -> Result<u8, Bmp280Error> {
        let mut data = [0u8];
        i2c.write_read(self.address, &[register.addr()], &mut data)
            .map_err(bus_error)?;
        Ok(data[0])
    }

    /// 读取芯片ID
    pub fn read_chip_id<I: I2c>(&self, i2c: &mut I) -> Result<u8, Bmp280Error> {
        self.read_register(i2c, Register::ChipId)
    }

    /// 读取状态寄存器
    pub fn read_status<I: I2c>(&self, i2c: &mut I) -> Result<Status, Bmp280Error> {
        self.read_register(i2c, Register::Status).map(Status::from)
    }

    /// 读回芯片当前的测量配置
    pub fn read_config<I: I2c>(&self, i2c: &mut I) -> Result<Config, Bmp280Error> {
        let mut data = [0u8; 2];
        i2c.write_read(self.address, &[Register::CtrlMeas.addr()], &mut data)
            .map_err(bus_error)?;
        Ok(Config::from_registers(data[0], data[1])?)
    }

    /// 一次读取 0x88 开始的24字节校准参数
    pub fn read_calibration<I: I2c>(&self, i2c: &mut I) -> Result<Calibration, Bmp280Error> {
        let mut data = [0u8; CALIBRATION_LEN];
        i2c.write_read(self.address, &[Register::CalibStart.addr()], &mut data)
            .map_err(bus_error)?;
        Ok(Calibration::from_bytes(&data))
    }

    /// 一次读取 0xF7 开始的6字节原始数据
    pub fn read_raw_sample<I: I2c>(&self, i2c: &mut I) -> Result<RawSample, Bmp280Error> {
        let mut data = [0u8; DATA_LEN];
        i2c.write_read(self.address, &[Register::PressMsb.addr()], &mut data)
            .map_err(bus_error)?;
        let sample = RawSample::from_data_block(data);
        debug!("adc_T={} adc_P={}", sample.temperature, sample.pressure);
        Ok(sample)
    }

    /// 读取补偿后的传感器数据
    ///
    /// 强制模式下先触发一次测量并等待完成，正常模式直接读取最近一次结果。
    pub fn read<I: I2c>(&self, i2c: &mut I) -> Result<Measurement, Bmp280Error> {
        if self.config.power_mode == PowerMode::Forced {
            i2c.write(self.address, &[Register::CtrlMeas.addr(), self.config.ctrl_meas()])
                .map_err(bus_error)?;
            thread::sleep(self.config.max_measurement_time());
        }

        let sample = self.read_raw_sample(i2c)?;
        let measurement = Measurement::compensate(sample, &self.calibration);
        if measurement.pressure_fixed64.is_err() {
            warn!("{:#04x} 校准参数不可用于压力补偿", self.address);
        }

        // OK
        Ok(measurement)
    }

    /// 软复位传感器，然后重新写入配置、重新读取校准数据
    pub fn reset<C, I>(&mut self, clock: &C, i2c: &mut I) -> Result<(), Bmp280Error>
    where
        C: Clock,
        I: I2c,
    {
        self.soft_reset(clock, i2c)?;
        self.apply_config(i2c)?;
        self.calibration = self.read_calibration(i2c)?;
        Ok(())
    }

    /// 写入 0xB6 触发软复位，并等待 im_update 清零
    fn soft_reset<C, I>(&self, clock: &C, i2c: &mut I) -> Result<(), Bmp280Error>
    where
        C: Clock,
        I: I2c,
    {
        i2c.write(self.address, &[Register::SoftReset.addr(), SOFT_RESET_COMMAND])
            .map_err(bus_error)?;
        thread::sleep(STARTUP_DELAY);

        let start = clock.now();
        loop {
            if !self.read_status(i2c)?.im_update {
                debug!("{:#04x} 软复位完成", self.address);
                return Ok(());
            }
            if clock.elapsed(start) > RESET_TIMEOUT {
                return Err(Bmp280Error::ResetTimeout);
            }
            thread::sleep(POLL_INTERVAL);
        }
    }

    /// 写入测量配置
    ///
    /// 正常模式下写 config 可能被忽略，所以先写 config 再写 ctrl_meas
    fn apply_config<I: I2c>(&self, i2c: &mut I) -> Result<(), Bmp280Error> {
        i2c.write(
            self.address,
            &[
                Register::Config.addr(),
                self.config.config(),
                Register::CtrlMeas.addr(),
                self.config.ctrl_meas(),
            ],
        )
        .map_err(bus_error)
    }
}
