//! Gamepad HID reports for [usb-device](https://crates.io/crates/usb-device).
//!
//! The crate has two halves:
//!
//! * [`composer::ReportComposer`] keeps the current state of a gamepad (six 16 bit axes, a hat
//!   switch and 32 buttons), normalises raw input values into the report's native range and
//!   hands finished reports to a [`composer::ReportSink`].
//! * [`gamepad::Gamepad`] is a `ReportSink` backed by a HID interface with an interrupt
//!   IN endpoint, hosted by [`usb_class::UsbHidClass`].
//!
//! Any transport can be used by implementing `ReportSink`:
//!
//! ```rust
//! use usbd_hid_gamepad::prelude::*;
//!
//! #[derive(Default)]
//! struct Sent(usize);
//!
//! impl ReportSink for Sent {
//!     type Error = core::convert::Infallible;
//!
//!     fn send(&mut self, _report: &[u8]) -> Result<(), Self::Error> {
//!         self.0 += 1;
//!         Ok(())
//!     }
//! }
//!
//! let mut pad = ReportComposer::new(Sent::default());
//! pad.begin();
//!
//! // 10 bit input by default, 512 is roughly centred
//! pad.set_position(512, 1023);
//! pad.button(1, true);
//! pad.set_hat(HatPosition::Left);
//!
//! let report = pad.report();
//! assert_eq!(report.y, 32767);
//! assert_eq!(report.buttons, 0b1);
//! assert_eq!(pad.sink().0, 3);
//! ```
//!
//! On hardware the composer owns the USB class, and the class is polled through it:
//!
//! ```rust,ignore
//! let usb_alloc = UsbBusAllocator::new(bus);
//!
//! let class = UsbHidClass::new(&usb_alloc, GamepadConfig::default());
//!
//! let mut usb_dev = UsbDeviceBuilder::new(&usb_alloc, UsbVidPid(0x1209, 0x0001))
//!     .product("Gamepad")
//!     .build();
//!
//! let mut pad = ReportComposer::new(class);
//! pad.begin();
//!
//! loop {
//!     pad.set_x(read_adc());
//!
//!     if tick_timer.wait().is_ok() {
//!         pad.sink_mut().tick().ok();
//!     }
//!
//!     usb_dev.poll(&mut [pad.sink_mut()]);
//! }
//! ```

#![no_std]

//Allow the use of std in tests
#[cfg(test)]
#[macro_use]
extern crate std;

use usb_device::UsbError;

pub mod composer;
pub mod descriptor;
pub mod gamepad;
pub mod interface;
pub mod prelude;
pub mod usb_class;

/// Errors raised while writing reports to the USB stack
#[derive(Debug)]
pub enum UsbHidError {
    /// The endpoint is still busy with the previous report
    WouldBlock,
    UsbError(UsbError),
    SerializationError,
}

impl From<UsbError> for UsbHidError {
    fn from(e: UsbError) -> Self {
        match e {
            UsbError::WouldBlock => Self::WouldBlock,
            _ => Self::UsbError(e),
        }
    }
}
