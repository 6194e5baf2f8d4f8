//! HID gamepad with six axes, a hat switch and 32 buttons
use core::default::Default;
use fugit::{ExtU32, MillisDurationU32};
use log::{error, info, trace};
use num_enum::{IntoPrimitive, TryFromPrimitive};
use packed_struct::prelude::*;
use usb_device::bus::{UsbBus, UsbBusAllocator};

use crate::composer::ReportSink;
use crate::interface::{Interface, InterfaceBuilder, InterfaceConfig};
use crate::UsbHidError;

/// Size of a packed [`GamepadReport`] in bytes
pub const GAMEPAD_REPORT_SIZE: usize = 17;

const BUTTON_COUNT: u8 = 32;

#[rustfmt::skip]
pub const GAMEPAD_REPORT_DESCRIPTOR: &[u8] = &[
    0x05, 0x01,        // Usage Page (Generic Desktop),
    0x09, 0x05,        // Usage (Game Pad),
    0xA1, 0x01,        // Collection (Application),
    0x09, 0x30,        //   Usage (X),
    0x09, 0x31,        //   Usage (Y),
    0x09, 0x32,        //   Usage (Z),
    0x09, 0x35,        //   Usage (Rz),
    0x09, 0x33,        //   Usage (Rx),
    0x09, 0x34,        //   Usage (Ry),
    0x16, 0x01, 0x80,  //   Logical Minimum (-32767),
    0x26, 0xFF, 0x7F,  //   Logical Maximum (32767),
    0x75, 0x10,        //   Report Size (16),
    0x95, 0x06,        //   Report Count (6),
    0x81, 0x02,        //   Input (Data, Variable, Absolute),

    0x09, 0x39,        //   Usage (Hat Switch),
    0x15, 0x01,        //   Logical Minimum (1),
    0x25, 0x08,        //   Logical Maximum (8),
    0x35, 0x00,        //   Physical Minimum (0),
    0x46, 0x3B, 0x01,  //   Physical Maximum (315),
    0x65, 0x14,        //   Unit (Degrees),
    0x75, 0x04,        //   Report Size (4),
    0x95, 0x01,        //   Report Count (1),
    0x81, 0x42,        //   Input (Data, Variable, Absolute, Null State),
    0x65, 0x00,        //   Unit (None),
    0x45, 0x00,        //   Physical Maximum (0),
    0x75, 0x04,        //   Report Size (4),
    0x95, 0x01,        //   Report Count (1),
    0x81, 0x03,        //   Input (Constant, Variable, Absolute),

    0x05, 0x09,        //   Usage Page (Buttons),
    0x19, 0x01,        //   Usage Minimum (1),
    0x29, 0x20,        //   Usage Maximum (32),
    0x15, 0x00,        //   Logical Minimum (0),
    0x25, 0x01,        //   Logical Maximum (1),
    0x75, 0x01,        //   Report Size (1),
    0x95, 0x20,        //   Report Count (32),
    0x81, 0x02,        //   Input (Data, Variable, Absolute),
    0xC0,              // End Collection
];

/// Hat switch direction, numbered clockwise from up. `Idle` is the null state.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Eq, PartialEq, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum HatPosition {
    Idle = 0,
    Up = 1,
    UpRight = 2,
    Right = 3,
    DownRight = 4,
    Down = 5,
    DownLeft = 6,
    Left = 7,
    UpLeft = 8,
}

const HAT_SECTORS: [HatPosition; 8] = [
    HatPosition::Up,
    HatPosition::UpRight,
    HatPosition::Right,
    HatPosition::DownRight,
    HatPosition::Down,
    HatPosition::DownLeft,
    HatPosition::Left,
    HatPosition::UpLeft,
];

impl HatPosition {
    /// Convert an angle in degrees, clockwise from up, to the nearest hat direction.
    ///
    /// `-1` means released. Any other angle is wrapped into `0..360`, so `359` is `Up`
    /// and `400` is `UpRight`. Sector boundaries sit at odd multiples of 22.5 degrees.
    #[must_use]
    pub fn from_angle(angle: i32) -> Self {
        if angle == -1 {
            return HatPosition::Idle;
        }
        let angle = angle.rem_euclid(360).unsigned_abs() as usize;
        HAT_SECTORS[((angle * 2 + 45) / 90) % HAT_SECTORS.len()]
    }
}

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Eq, PartialEq, Default, PackedStruct)]
#[packed_struct(endian = "lsb", size_bytes = "17")]
pub struct GamepadReport {
    #[packed_field]
    pub x: i16,
    #[packed_field]
    pub y: i16,
    #[packed_field]
    pub z: i16,
    #[packed_field]
    pub rz: i16,
    #[packed_field]
    pub rx: i16,
    #[packed_field]
    pub ry: i16,
    /// Low nibble holds a [`HatPosition`], high nibble is padding
    #[packed_field]
    pub hat: u8,
    #[packed_field]
    pub buttons: u32,
}

impl GamepadReport {
    /// `index` is zero based, out of range buttons read as released
    #[must_use]
    pub fn button(&self, index: u8) -> bool {
        index < BUTTON_COUNT && self.buttons & (1 << index) != 0
    }

    /// `index` is zero based, out of range buttons are ignored
    pub fn set_button(&mut self, index: u8, pressed: bool) {
        if index >= BUTTON_COUNT {
            return;
        }
        if pressed {
            self.buttons |= 1 << index;
        } else {
            self.buttons &= !(1 << index);
        }
    }

    /// Invalid hat values read as [`HatPosition::Idle`]
    #[must_use]
    pub fn hat_position(&self) -> HatPosition {
        HatPosition::try_from(self.hat & 0x0F).unwrap_or(HatPosition::Idle)
    }

    pub fn set_hat_position(&mut self, hat: HatPosition) {
        self.hat = hat.into();
    }
}

/// A gamepad on its own HID interface.
///
/// The last report written is repeated at the host's idle rate and answers GET_REPORT.
/// While unregistered the gamepad drops reports instead of writing them.
pub struct Gamepad<'a, B: UsbBus> {
    interface: Interface<'a, B>,
    last_report: Option<GamepadReport>,
    since_report: MillisDurationU32,
    registered: bool,
}

impl<'a, B: UsbBus> Gamepad<'a, B> {
    #[must_use]
    pub fn new(usb_alloc: &'a UsbBusAllocator<B>, config: GamepadConfig<'a>) -> Self {
        Self {
            interface: Interface::new(usb_alloc, config.interface),
            last_report: None,
            since_report: 0.millis(),
            registered: true,
        }
    }

    #[must_use]
    pub fn interface(&self) -> &Interface<'a, B> {
        &self.interface
    }

    pub fn interface_mut(&mut self) -> &mut Interface<'a, B> {
        &mut self.interface
    }

    pub fn write_report(&mut self, report: &GamepadReport) -> Result<(), UsbHidError> {
        if !self.registered {
            trace!("Gamepad unregistered, report dropped");
            return Ok(());
        }

        let data = report.pack().map_err(|_| {
            error!("Error packing GamepadReport");
            UsbHidError::SerializationError
        })?;
        self.last_report = Some(*report);
        self.since_report = 0.millis();
        self.interface
            .write_report(&data)
            .map(|_| ())
            .map_err(UsbHidError::from)
    }

    /// The report most recently written, `None` while unregistered or after a bus reset
    #[must_use]
    pub fn last_report(&self) -> Option<GamepadReport> {
        self.last_report
    }

    /// Repeat the last report once the idle period has passed. Call every 1ms.
    pub fn tick(&mut self) -> Result<(), UsbHidError> {
        let period = self.interface.idle_period();
        let Some(report) = self.last_report else {
            return Ok(());
        };

        if period.ticks() == 0 {
            self.since_report = 0.millis();
            return Ok(());
        }
        if self.since_report < period {
            self.since_report += 1.millis();
            return Ok(());
        }

        match self.write_report(&report) {
            Err(UsbHidError::WouldBlock) => {
                trace!("Idle repeat skipped, endpoint busy");
                self.since_report = 0.millis();
                Ok(())
            }
            result => result,
        }
    }

    /// Bus reset, restores the interface defaults and forgets the last report
    pub fn reset(&mut self) {
        self.interface.reset();
        self.last_report = None;
        self.since_report = 0.millis();
    }
}

impl<'a, B: UsbBus> ReportSink for Gamepad<'a, B> {
    type Error = UsbHidError;

    fn register(&mut self) {
        info!("Gamepad registered");
        self.registered = true;
    }

    fn unregister(&mut self) {
        info!("Gamepad unregistered");
        self.registered = false;
        self.last_report = None;
        self.interface.clear_report();
    }

    fn send(&mut self, report: &[u8]) -> Result<(), Self::Error> {
        let report = GamepadReport::unpack_from_slice(report).map_err(|_| {
            error!("Expected a {} byte gamepad report", GAMEPAD_REPORT_SIZE);
            UsbHidError::SerializationError
        })?;
        self.write_report(&report)
    }
}

pub struct GamepadConfig<'a> {
    interface: InterfaceConfig<'a>,
}

impl<'a> GamepadConfig<'a> {
    #[must_use]
    pub fn new(interface: InterfaceConfig<'a>) -> Self {
        Self { interface }
    }
}

impl<'a> Default for GamepadConfig<'a> {
    /// Described as "Gamepad", polled every 10ms, no idle repeat
    #[must_use]
    fn default() -> Self {
        match InterfaceBuilder::new(GAMEPAD_REPORT_DESCRIPTOR)
            .and_then(|builder| builder.in_endpoint(10.millis()))
        {
            Ok(builder) => Self::new(builder.description("Gamepad").build()),
            Err(_) => panic!("Invalid default gamepad interface configuration"),
        }
    }
}
