//! The USB HID gamepad prelude.
//!
//! The purpose of this module is to alleviate imports of structs and enums
//! required to compose gamepad reports and instance the USB class:
//!
//! ```
//! # #![allow(unused_imports)]
//! use usbd_hid_gamepad::prelude::*;
//! ```

pub use crate::composer::{ReportComposer, ReportSink, ScalingMode};
pub use crate::descriptor::HidProtocol;
pub use crate::gamepad::{
    Gamepad, GamepadConfig, GamepadReport, HatPosition, GAMEPAD_REPORT_DESCRIPTOR,
    GAMEPAD_REPORT_SIZE,
};
pub use crate::interface::{Interface, InterfaceBuilder, InterfaceConfig};
pub use crate::usb_class::{UsbHidBuilderError, UsbHidClass};
pub use crate::UsbHidError;
