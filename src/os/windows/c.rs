// Copyright (c) 2023 Jonathan "Razordor" Alan Thomason
#![allow(clippy::upper_case_acronyms)]
#![allow(non_snake_case)]

use std::ffi;
pub use std::os::windows::raw::HANDLE;

pub type HMODULE = HANDLE;
pub type PCWSTR = *const u16;
pub type PCSTR = *const ffi::c_char;
pub type BOOL = i32;
pub type DWORD = u32;

#[link(name = "kernel32")]
extern "system" {
	pub fn LoadLibraryExW(lplibfilename: PCWSTR, hfile: HANDLE, dwflags: DWORD) -> HMODULE;
	pub fn GetModuleHandleExW(dwflags: DWORD, lpmodulename: PCWSTR, phmodule: *mut HMODULE) -> BOOL;
	pub fn GetProcAddress(handle: HMODULE, symbol: PCSTR) -> *mut ffi::c_void;
	pub fn FreeLibrary(hlibmodule: HMODULE) -> BOOL;
	pub fn SetThreadErrorMode(dwnewmode: DWORD, lpoldmode: *mut DWORD) -> BOOL;
}

pub const LOAD_LIBRARY_SEARCH_DEFAULT_DIRS: DWORD = 0x00001000;
pub const LOAD_LIBRARY_SAFE_CURRENT_DIRS: DWORD = 0x00002000;

pub const SEM_FAILCRITICALERRORS: DWORD = 0x0001;

pub const ERROR_FILE_NOT_FOUND: i32 = 2;
pub const ERROR_PATH_NOT_FOUND: i32 = 3;
pub const ERROR_ACCESS_DENIED: i32 = 5;
pub const ERROR_BAD_FORMAT: i32 = 11;
pub const ERROR_MOD_NOT_FOUND: i32 = 126;
pub const ERROR_BAD_EXE_FORMAT: i32 = 193;
pub const ERROR_EXE_MACHINE_TYPE_MISMATCH: i32 = 216;
