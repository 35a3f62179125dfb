//! Raw binding to the OpenVR `IVRSystem` vtable.
//!
//! The interface object's first word points at its vtable. Slot indices are
//! fixed across the supported interface versions; a runtime that reorders
//! them will be called incorrectly.

use std::ffi::{c_char, c_void, CString};
use std::mem;
use std::ptr::NonNull;

use super::{
    ControllerRole, PollerError, SystemProvider, TrackedDeviceIndex, VrSystem,
    INVALID_DEVICE_INDEX,
};
use crate::snapshot::ControllerSnapshot;

/// `IVRSystem::GetTrackedDeviceIndexForControllerRole`.
pub const SLOT_DEVICE_INDEX_FOR_ROLE: usize = 18;
/// `IVRSystem::GetControllerState`.
pub const SLOT_CONTROLLER_STATE: usize = 34;

pub const RUNTIME_MODULE: &str = "openvr_api.dll";
pub const ENTRY_POINT: &str = "VR_GetGenericInterface";

// Interface methods use the platform's member-call convention, which on
// 64-bit targets is the C convention with `this` first.
pub type DeviceIndexForRoleFn =
    unsafe extern "C" fn(this: *mut c_void, role: i32) -> TrackedDeviceIndex;
pub type ControllerStateFn = unsafe extern "C" fn(
    this: *mut c_void,
    index: TrackedDeviceIndex,
    state: *mut ControllerSnapshot,
    state_size: u32,
) -> bool;
pub type GetGenericInterfaceFn =
    unsafe extern "C" fn(version: *const c_char, error: *mut i32) -> *mut c_void;

/// A system interface bound through its vtable.
#[derive(Debug)]
pub struct VtableSystem {
    this: NonNull<c_void>,
    device_index_for_role: DeviceIndexForRoleFn,
    controller_state: ControllerStateFn,
}

impl VtableSystem {
    /// # Safety
    ///
    /// `interface` must be null or point at a live `IVRSystem` object that
    /// outlives the returned value.
    pub unsafe fn from_interface(interface: *mut c_void) -> Result<Self, PollerError> {
        let this = NonNull::new(interface).ok_or(PollerError::NullVtable)?;
        let vtable = *(this.as_ptr() as *const *const usize);
        if vtable.is_null() {
            return Err(PollerError::NullVtable);
        }
        let index_slot = *vtable.add(SLOT_DEVICE_INDEX_FOR_ROLE);
        if index_slot == 0 {
            return Err(PollerError::NullVtableSlot {
                slot: SLOT_DEVICE_INDEX_FOR_ROLE,
            });
        }
        let state_slot = *vtable.add(SLOT_CONTROLLER_STATE);
        if state_slot == 0 {
            return Err(PollerError::NullVtableSlot {
                slot: SLOT_CONTROLLER_STATE,
            });
        }
        Ok(Self {
            this,
            device_index_for_role: mem::transmute::<usize, DeviceIndexForRoleFn>(index_slot),
            controller_state: mem::transmute::<usize, ControllerStateFn>(state_slot),
        })
    }
}

impl VrSystem for VtableSystem {
    fn device_index_for_role(&self, role: ControllerRole) -> TrackedDeviceIndex {
        if role == ControllerRole::Invalid {
            return INVALID_DEVICE_INDEX;
        }
        unsafe { (self.device_index_for_role)(self.this.as_ptr(), role as i32) }
    }

    fn controller_state(&self, index: TrackedDeviceIndex, state: &mut ControllerSnapshot) -> bool {
        let size = mem::size_of::<ControllerSnapshot>() as u32;
        unsafe { (self.controller_state)(self.this.as_ptr(), index, state, size) }
    }
}

/// The runtime's exported entry point, resolved from an already loaded
/// `openvr_api.dll`. The module is never loaded by us.
#[derive(Debug, Clone, Copy)]
pub struct OpenVrApi {
    get_generic_interface: GetGenericInterfaceFn,
}

impl OpenVrApi {
    pub fn from_entry_point(get_generic_interface: GetGenericInterfaceFn) -> Self {
        Self {
            get_generic_interface,
        }
    }

    #[cfg(windows)]
    pub fn load() -> Result<Self, PollerError> {
        use windows::core::{s, w};
        use windows::Win32::System::LibraryLoader::{GetModuleHandleW, GetProcAddress};

        unsafe {
            let module = GetModuleHandleW(w!("openvr_api.dll")).map_err(|err| {
                log::debug!("{RUNTIME_MODULE} not loaded: {err}");
                PollerError::RuntimeNotLoaded
            })?;
            let proc = GetProcAddress(module, s!("VR_GetGenericInterface"))
                .ok_or(PollerError::EntryPointMissing(ENTRY_POINT))?;
            Ok(Self::from_entry_point(mem::transmute::<
                unsafe extern "system" fn() -> isize,
                GetGenericInterfaceFn,
            >(proc)))
        }
    }

    #[cfg(not(windows))]
    pub fn load() -> Result<Self, PollerError> {
        Err(PollerError::RuntimeNotLoaded)
    }
}

impl SystemProvider for OpenVrApi {
    fn acquire(&self, version: &'static str) -> Result<Box<dyn VrSystem>, PollerError> {
        let name = CString::new(version)
            .map_err(|_| PollerError::InterfaceUnavailable { version, code: -1 })?;
        let mut code = 0i32;
        let interface = unsafe { (self.get_generic_interface)(name.as_ptr(), &mut code) };
        if interface.is_null() || code != 0 {
            return Err(PollerError::InterfaceUnavailable { version, code });
        }
        let system = unsafe { VtableSystem::from_interface(interface)? };
        Ok(Box::new(system))
    }
}
