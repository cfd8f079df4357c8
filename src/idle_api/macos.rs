use std::{ffi::CString, os::raw::c_char, time::Duration};

use anyhow::{anyhow, bail, Result};
use core_foundation::{
    base::{CFAllocatorRef, CFType, CFTypeRef, TCFType},
    data::CFData,
    number::CFNumber,
    string::{CFString, CFStringRef},
};
use tracing::instrument;

use super::{IdleProbe, ProbeError};

type IoObject = u32;

#[link(name = "IOKit", kind = "framework")]
extern "C" {
    fn IOServiceGetMatchingService(main_port: u32, matching: CFTypeRef) -> IoObject;
    fn IOServiceMatching(name: *const c_char) -> CFTypeRef;
    fn IORegistryEntryCreateCFProperty(
        entry: IoObject,
        key: CFStringRef,
        allocator: CFAllocatorRef,
        options: u32,
    ) -> CFTypeRef;
    fn IOObjectRelease(object: IoObject) -> i32;
}

/// Reads `HIDIdleTime` from the IOHIDSystem registry entry. The service is looked up once and
/// released on drop.
pub struct MacosIdleProbe {
    service: IoObject,
}

impl MacosIdleProbe {
    pub fn new() -> Result<Self> {
        let name = CString::new("IOHIDSystem")?;
        // IOServiceGetMatchingService consumes the matching dictionary.
        let service = unsafe {
            let matching = IOServiceMatching(name.as_ptr());
            if matching.is_null() {
                bail!("could not build IOHIDSystem matching dictionary");
            }
            IOServiceGetMatchingService(0, matching)
        };
        if service == 0 {
            bail!("IOHIDSystem service not found");
        }
        Ok(Self { service })
    }

    #[instrument(skip(self))]
    fn query_idle(&self) -> Result<Duration> {
        let key = CFString::new("HIDIdleTime");
        let property = unsafe {
            IORegistryEntryCreateCFProperty(
                self.service,
                key.as_concrete_TypeRef(),
                std::ptr::null(),
                0,
            )
        };
        if property.is_null() {
            bail!("HIDIdleTime property is missing");
        }
        let value = unsafe { CFType::wrap_under_create_rule(property) };

        let nanos = if let Some(number) = value.downcast::<CFNumber>() {
            number
                .to_i64()
                .and_then(|nanos| u64::try_from(nanos).ok())
                .ok_or_else(|| anyhow!("HIDIdleTime is not a valid nanosecond count"))?
        } else if let Some(data) = value.downcast::<CFData>() {
            let bytes = data
                .bytes()
                .get(..8)
                .and_then(|bytes| <[u8; 8]>::try_from(bytes).ok())
                .ok_or_else(|| anyhow!("HIDIdleTime data is shorter than 8 bytes"))?;
            u64::from_ne_bytes(bytes)
        } else {
            bail!("HIDIdleTime has an unexpected type");
        };
        Ok(Duration::from_nanos(nanos))
    }
}

impl IdleProbe for MacosIdleProbe {
    fn idle_time(&mut self) -> Result<Duration, ProbeError> {
        Ok(self.query_idle()?)
    }
}

impl Drop for MacosIdleProbe {
    fn drop(&mut self) {
        unsafe {
            IOObjectRelease(self.service);
        }
    }
}
