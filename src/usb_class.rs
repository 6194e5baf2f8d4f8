//! USB class hosting the HID gamepad

use crate::composer::ReportSink;
use crate::descriptor::{DescriptorType, HidProtocol, HidRequest, ReportType};
use crate::gamepad::{Gamepad, GamepadConfig};
use crate::UsbHidError;
use log::{error, info, trace, warn};
#[allow(clippy::wildcard_imports)]
use usb_device::class_prelude::*;
use usb_device::control::{Recipient, Request, RequestType};
use usb_device::Result;

/// [`crate::interface::InterfaceBuilder`] error
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsbHidBuilderError {
    /// A value is greater than the acceptable range of input values
    ValueOverflow,
    /// A slice of data is longer than permitted
    SliceLengthOverflow,
}

pub type BuilderResult<B> = core::result::Result<B, UsbHidBuilderError>;

/// USB Human Interface Device class with a single gamepad interface
pub struct UsbHidClass<'a, B: UsbBus> {
    gamepad: Gamepad<'a, B>,
}

impl<'a, B: UsbBus> UsbHidClass<'a, B> {
    pub fn new(usb_alloc: &'a UsbBusAllocator<B>, config: GamepadConfig<'a>) -> Self {
        Self {
            gamepad: Gamepad::new(usb_alloc, config),
        }
    }

    #[must_use]
    pub fn gamepad(&self) -> &Gamepad<'a, B> {
        &self.gamepad
    }

    pub fn gamepad_mut(&mut self) -> &mut Gamepad<'a, B> {
        &mut self.gamepad
    }

    /// Provide a clock tick to allow the tracking of time. Call this every 1ms / at 1KHz
    pub fn tick(&mut self) -> core::result::Result<(), UsbHidError> {
        self.gamepad.tick()
    }

    fn addressed_to_gamepad(&self, request: &Request) -> bool {
        request.recipient == Recipient::Interface
            && u8::try_from(request.index)
                .map_or(false, |index| index == u8::from(self.gamepad.interface().number()))
    }
}

impl<'a, B: UsbBus + 'a> UsbClass<B> for UsbHidClass<'a, B> {
    fn get_configuration_descriptors(&self, writer: &mut DescriptorWriter) -> Result<()> {
        self.gamepad.interface().write_descriptors(writer)?;
        info!("wrote class config descriptor");
        Ok(())
    }

    fn get_string(&self, index: StringIndex, _lang_id: u16) -> Option<&str> {
        self.gamepad.interface().description(index)
    }

    fn reset(&mut self) {
        info!("Reset");
        self.gamepad.reset();
    }

    fn control_in(&mut self, transfer: ControlIn<B>) {
        let request: &Request = transfer.request();
        if !self.addressed_to_gamepad(request) {
            return;
        }

        trace!(
            "ctrl_in: request type: {:?}, request: {}, value: {}",
            request.request_type,
            request.request,
            request.value
        );

        let interface = self.gamepad.interface();
        let code = request.request;
        let [value_low, value_high] = request.value.to_le_bytes();
        let result = match (request.request_type, code) {
            (RequestType::Standard, Request::GET_DESCRIPTOR) => {
                match DescriptorType::try_from(value_high) {
                    Ok(DescriptorType::Report) => {
                        transfer.accept_with(interface.report_descriptor())
                    }
                    Ok(DescriptorType::Hid) => match interface.hid_descriptor() {
                        Ok(descriptor) => transfer.accept_with(&descriptor),
                        Err(e) => Err(e),
                    },
                    Err(_) => {
                        warn!("Unsupported descriptor type {:X}", value_high);
                        return;
                    }
                }
            }
            (RequestType::Class, _) => match HidRequest::try_from(code) {
                Ok(HidRequest::GetReport) => {
                    if !matches!(ReportType::try_from(value_high), Ok(ReportType::Input)) {
                        warn!("Unsupported GetReport report type {:X}", value_high);
                        return;
                    }
                    let Some(report) = interface.current_report() else {
                        trace!("GetReport unanswered, no report written");
                        return;
                    };
                    if usize::from(request.length) != report.len() {
                        warn!(
                            "GetReport expected {} bytes, report is {} bytes",
                            request.length,
                            report.len()
                        );
                    }
                    transfer.accept_with(report)
                }
                Ok(HidRequest::GetIdle) => {
                    info!("Get idle for ID{}: {}", value_low, interface.idle());
                    transfer.accept_with(&[interface.idle()])
                }
                Ok(HidRequest::GetProtocol) => {
                    info!("Get protocol: {:?}", interface.protocol());
                    transfer.accept_with(&[interface.protocol().into()])
                }
                _ => {
                    warn!("Unsupported control_in class request {}", code);
                    return;
                }
            },
            _ => return,
        };

        if let Err(e) = result {
            error!("Failed to answer request {} - {:?}", code, e);
        }
    }

    fn control_out(&mut self, transfer: ControlOut<B>) {
        let request: &Request = transfer.request();
        if request.request_type != RequestType::Class || !self.addressed_to_gamepad(request) {
            return;
        }

        trace!(
            "ctrl_out: request: {}, value: {}",
            request.request,
            request.value
        );

        let [value_low, value_high] = request.value.to_le_bytes();
        let interface = self.gamepad.interface_mut();
        match HidRequest::try_from(request.request) {
            Ok(HidRequest::SetIdle) => {
                if request.length != 0 {
                    warn!("Expected SetIdle to have length 0, received {}", request.length);
                }
                interface.set_idle(value_low, value_high);
                transfer.accept().ok();
            }
            Ok(HidRequest::SetProtocol) => {
                if request.length != 0 {
                    warn!(
                        "Expected SetProtocol to have length 0, received {}",
                        request.length
                    );
                }
                match HidProtocol::try_from(value_low) {
                    Ok(protocol) => {
                        interface.set_protocol(protocol);
                        transfer.accept().ok();
                    }
                    Err(_) => error!("Unable to set protocol, unsupported value:{}", value_low),
                }
            }
            Ok(HidRequest::SetReport) => {
                warn!("SetReport unsupported, the gamepad has no output reports");
            }
            _ => {
                warn!("Unsupported control_out class request {}", request.request);
            }
        }
    }
}

/// Composer sink for the hosted gamepad
impl<'a, B: UsbBus + 'a> ReportSink for UsbHidClass<'a, B> {
    type Error = UsbHidError;

    fn register(&mut self) {
        self.gamepad.register();
    }

    fn unregister(&mut self) {
        self.gamepad.unregister();
    }

    fn send(&mut self, report: &[u8]) -> core::result::Result<(), Self::Error> {
        self.gamepad.send(report)
    }
}
