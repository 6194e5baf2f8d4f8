//! HID interface with a single interrupt IN endpoint
use crate::descriptor::{
    DescriptorType, HidProtocol, COUNTRY_CODE_NOT_SUPPORTED, INTERFACE_PROTOCOL_NONE,
    INTERFACE_SUBCLASS_NONE, SPEC_VERSION_1_11, USB_CLASS_HID,
};
use crate::usb_class::{BuilderResult, UsbHidBuilderError};
use fugit::{ExtU32, MillisDurationU32};
use heapless::Vec;
use log::{info, warn};
use packed_struct::prelude::*;
use usb_device::bus::{StringIndex, UsbBus, UsbBusAllocator};
use usb_device::class_prelude::{DescriptorWriter, EndpointIn, InterfaceNumber};
use usb_device::UsbError;

/// Largest input report an interface can hold
pub const MAX_REPORT_SIZE: usize = 32;
const IN_PACKET_SIZE: u16 = 32;
const DEFAULT_POLL_MS: u8 = 20;
/// SET_IDLE durations count in 4ms steps
const IDLE_STEP_MS: u32 = 4;

/// Class descriptor, HID 1.11 section 6.2.1, with a single report descriptor
#[derive(Debug, PackedStruct)]
#[packed_struct(endian = "lsb", size_bytes = "9")]
struct HidDescriptor {
    length: u8,
    #[packed_field(ty = "enum", size_bytes = "1")]
    descriptor_type: DescriptorType,
    bcd_hid: u16,
    country_code: u8,
    descriptor_count: u8,
    #[packed_field(ty = "enum", size_bytes = "1")]
    report_descriptor_type: DescriptorType,
    report_descriptor_length: u16,
}

/// Validated interface settings, produced by [`InterfaceBuilder`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterfaceConfig<'a> {
    report_descriptor: &'a [u8],
    report_descriptor_length: u16,
    description: Option<&'a str>,
    poll_ms: u8,
    idle_steps: u8,
}

pub struct Interface<'a, B: UsbBus> {
    number: InterfaceNumber,
    endpoint: EndpointIn<'a, B>,
    config: InterfaceConfig<'a>,
    description_index: Option<StringIndex>,
    protocol: HidProtocol,
    idle_steps: u8,
    report: Vec<u8, MAX_REPORT_SIZE>,
}

impl<'a, B: UsbBus> Interface<'a, B> {
    pub(crate) fn new(usb_alloc: &'a UsbBusAllocator<B>, config: InterfaceConfig<'a>) -> Self {
        Self {
            number: usb_alloc.interface(),
            endpoint: usb_alloc.interrupt(IN_PACKET_SIZE, config.poll_ms),
            description_index: config.description.map(|_| usb_alloc.string()),
            //HID 1.11 section 7.2.6, devices start in report protocol
            protocol: HidProtocol::Report,
            idle_steps: config.idle_steps,
            report: Vec::new(),
            config,
        }
    }

    #[must_use]
    pub fn number(&self) -> InterfaceNumber {
        self.number
    }

    #[must_use]
    pub fn report_descriptor(&self) -> &'a [u8] {
        self.config.report_descriptor
    }

    pub(crate) fn hid_descriptor(&self) -> usb_device::Result<[u8; 9]> {
        HidDescriptor {
            length: 9,
            descriptor_type: DescriptorType::Hid,
            bcd_hid: SPEC_VERSION_1_11,
            country_code: COUNTRY_CODE_NOT_SUPPORTED,
            descriptor_count: 1,
            report_descriptor_type: DescriptorType::Report,
            report_descriptor_length: self.config.report_descriptor_length,
        }
        .pack()
        .map_err(|_| UsbError::ParseError)
    }

    /// Interface, HID and endpoint descriptors, in the order HID 1.11 appendix F.3 requires
    pub(crate) fn write_descriptors(&self, writer: &mut DescriptorWriter) -> usb_device::Result<()> {
        writer.interface_alt(
            self.number,
            usb_device::device::DEFAULT_ALTERNATE_SETTING,
            USB_CLASS_HID,
            INTERFACE_SUBCLASS_NONE,
            INTERFACE_PROTOCOL_NONE,
            self.description_index,
        )?;
        // the writer adds length and type itself
        writer.write(DescriptorType::Hid.into(), &self.hid_descriptor()?[2..])?;
        writer.endpoint(&self.endpoint)
    }

    pub(crate) fn description(&self, index: StringIndex) -> Option<&'a str> {
        match self.description_index {
            Some(i) if i == index => self.config.description,
            _ => None,
        }
    }

    #[must_use]
    pub fn protocol(&self) -> HidProtocol {
        self.protocol
    }

    pub fn set_protocol(&mut self, protocol: HidProtocol) {
        info!("Set protocol to {:?}", protocol);
        self.protocol = protocol;
    }

    /// Raw SET_IDLE value in 4ms steps, zero disables idle repeats
    #[must_use]
    pub fn idle(&self) -> u8 {
        self.idle_steps
    }

    /// There is a single report without an id, so only the global rate (id 0) is stored
    pub fn set_idle(&mut self, report_id: u8, steps: u8) {
        if report_id != 0 {
            warn!("Ignoring idle for report id {:X}", report_id);
            return;
        }
        info!("Set idle to {} steps", steps);
        self.idle_steps = steps;
    }

    #[must_use]
    pub fn idle_period(&self) -> MillisDurationU32 {
        (u32::from(self.idle_steps) * IDLE_STEP_MS).millis()
    }

    /// Write an input report to the IN endpoint.
    ///
    /// The report is kept for GET_REPORT even when the endpoint is busy.
    pub fn write_report(&mut self, data: &[u8]) -> usb_device::Result<usize> {
        self.report = Vec::from_slice(data).map_err(|_| UsbError::BufferOverflow)?;
        self.endpoint.write(data)
    }

    /// The report GET_REPORT answers with, `None` until one is written
    #[must_use]
    pub fn current_report(&self) -> Option<&[u8]> {
        (!self.report.is_empty()).then_some(self.report.as_slice())
    }

    pub fn clear_report(&mut self) {
        self.report.clear();
    }

    pub fn reset(&mut self) {
        self.protocol = HidProtocol::Report;
        self.idle_steps = self.config.idle_steps;
        self.report.clear();
    }
}

#[must_use = "this `InterfaceBuilder` must be assigned or consumed by `::build()`"]
#[derive(Copy, Clone, Debug)]
pub struct InterfaceBuilder<'a> {
    config: InterfaceConfig<'a>,
}

impl<'a> InterfaceBuilder<'a> {
    pub fn new(report_descriptor: &'a [u8]) -> BuilderResult<Self> {
        let report_descriptor_length = u16::try_from(report_descriptor.len())
            .map_err(|_| UsbHidBuilderError::SliceLengthOverflow)?;

        Ok(Self {
            config: InterfaceConfig {
                report_descriptor,
                report_descriptor_length,
                description: None,
                poll_ms: DEFAULT_POLL_MS,
                idle_steps: 0,
            },
        })
    }

    pub fn description(mut self, description: &'a str) -> Self {
        self.config.description = Some(description);
        self
    }

    /// Interval the host polls the IN endpoint at, at most 255ms
    pub fn in_endpoint(mut self, poll_interval: MillisDurationU32) -> BuilderResult<Self> {
        self.config.poll_ms = u8::try_from(poll_interval.to_millis())
            .map_err(|_| UsbHidBuilderError::ValueOverflow)?;
        Ok(self)
    }

    /// Idle period until the host sends SET_IDLE, rounded up to a whole 4ms step
    pub fn idle_default(mut self, period: MillisDurationU32) -> BuilderResult<Self> {
        let steps = period.to_millis().saturating_add(IDLE_STEP_MS - 1) / IDLE_STEP_MS;
        self.config.idle_steps =
            u8::try_from(steps).map_err(|_| UsbHidBuilderError::ValueOverflow)?;
        Ok(self)
    }

    pub fn build(self) -> InterfaceConfig<'a> {
        self.config
    }
}
