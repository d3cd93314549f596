use std::{
    ffi::{c_char, c_void, CStr, CString},
    ptr,
    sync::{Arc, Mutex, PoisonError},
};

use serde_json::json;
use tokio::runtime::{Builder, Runtime as AsyncRuntime};
use watchdeck_core::{config::RuntimeConfig, logging, Runtime};

type WdEventCallback = unsafe extern "C" fn(event_json: *const c_char, user_data: *mut c_void);

#[derive(Clone, Copy)]
struct CallbackRegistration {
    callback: WdEventCallback,
    user_data: usize,
}

pub struct WdRuntimeHandle {
    runtime: Runtime,
    executor: AsyncRuntime,
    callback: Arc<Mutex<Option<CallbackRegistration>>>,
}

/// Returns null when the config is not valid JSON or the executor cannot
/// start. The handle must be released with `wd_runtime_free`.
///
/// # Safety
/// `config_json` must be null or a valid NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn wd_runtime_new(config_json: *const c_char) -> *mut WdRuntimeHandle {
    let config = if config_json.is_null() {
        String::new()
    } else {
        match CStr::from_ptr(config_json).to_str() {
            Ok(value) => value.to_string(),
            Err(error) => {
                log::error!("wd_runtime_new: invalid UTF-8 config json: {error}");
                return ptr::null_mut();
            }
        }
    };

    let config = match RuntimeConfig::from_json(&config) {
        Ok(value) => value,
        Err(error) => {
            log::error!("wd_runtime_new: {error:#}");
            return ptr::null_mut();
        }
    };
    logging::init_logger(config.log_level.as_deref());

    let executor = match Builder::new_multi_thread()
        .worker_threads(2)
        .thread_name("watchdeck-io")
        .enable_all()
        .build()
    {
        Ok(value) => value,
        Err(error) => {
            log::error!("wd_runtime_new: failed to start async executor: {error}");
            return ptr::null_mut();
        }
    };

    let runtime = Runtime::from_config(&config);

    let callback = Arc::new(Mutex::new(None::<CallbackRegistration>));
    let callback_ref = Arc::clone(&callback);
    runtime.set_event_callback(move |_event, payload| {
        let registration = {
            let guard = callback_ref.lock().unwrap_or_else(PoisonError::into_inner);
            *guard
        };
        if let Some(registration) = registration {
            if let Ok(c_payload) = CString::new(payload.to_string()) {
                let user_data = registration.user_data as *mut c_void;
                unsafe { (registration.callback)(c_payload.as_ptr(), user_data) };
            }
        }
    });

    Box::into_raw(Box::new(WdRuntimeHandle {
        runtime,
        executor,
        callback,
    }))
}

/// # Safety
/// `handle` must come from `wd_runtime_new` and not be used afterwards.
#[no_mangle]
pub unsafe extern "C" fn wd_runtime_free(handle: *mut WdRuntimeHandle) {
    if handle.is_null() {
        return;
    }
    let boxed = Box::from_raw(handle);
    boxed.runtime.clear_event_callback();
    {
        let mut guard = boxed.callback.lock().unwrap_or_else(PoisonError::into_inner);
        *guard = None;
    }
    boxed.executor.shutdown_background();
}

/// Passing a null callback unregisters the current one.
///
/// # Safety
/// `handle` must be a live handle. `user_data` is handed back verbatim and
/// must stay valid for as long as the callback is registered.
#[no_mangle]
pub unsafe extern "C" fn wd_set_event_callback(
    handle: *mut WdRuntimeHandle,
    callback: Option<WdEventCallback>,
    user_data: *mut c_void,
) {
    if handle.is_null() {
        return;
    }

    let handle = &*handle;
    let mut guard = handle.callback.lock().unwrap_or_else(PoisonError::into_inner);
    *guard = callback.map(|value| CallbackRegistration {
        callback: value,
        user_data: user_data as usize,
    });
}

/// Runs one command to completion, blocking the calling thread while
/// metadata requests are in flight. The returned string must be released
/// with `wd_free_c_string`.
///
/// # Safety
/// `handle` must be a live handle and `request_json` a valid NUL-terminated
/// string. Must not be called from inside an async executor.
#[no_mangle]
pub unsafe extern "C" fn wd_invoke_json(
    handle: *mut WdRuntimeHandle,
    request_json: *const c_char,
) -> *mut c_char {
    if handle.is_null() {
        return into_c_string(json_error("invalid_handle", "runtime handle is null").to_string());
    }
    if request_json.is_null() {
        return into_c_string(json_error("invalid_request", "request_json is null").to_string());
    }

    let request = match CStr::from_ptr(request_json).to_str() {
        Ok(value) => value,
        Err(error) => {
            return into_c_string(
                json_error("invalid_request", &format!("request_json must be UTF-8: {error}"))
                    .to_string(),
            );
        }
    };

    let handle = &*handle;
    let response = handle
        .executor
        .block_on(handle.runtime.invoke_json_async(request));
    into_c_string(response)
}

/// # Safety
/// `ptr` must be null or a string returned by `wd_invoke_json`.
#[no_mangle]
pub unsafe extern "C" fn wd_free_c_string(ptr: *mut c_char) {
    if ptr.is_null() {
        return;
    }
    drop(CString::from_raw(ptr));
}

fn into_c_string(value: String) -> *mut c_char {
    let text = CString::new(value).unwrap_or_else(|_| {
        CString::from(
            c"{\"ok\":false,\"error\":{\"code\":\"encoding_failure\",\"message\":\"response contains invalid NUL\"}}",
        )
    });
    text.into_raw()
}

fn json_error(code: &str, message: &str) -> serde_json::Value {
    json!({
        "ok": false,
        "error": {
            "code": code,
            "message": message
        }
    })
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    static EVENTS: AtomicUsize = AtomicUsize::new(0);

    unsafe extern "C" fn count_events(_event_json: *const c_char, _user_data: *mut c_void) {
        EVENTS.fetch_add(1, Ordering::SeqCst);
    }

    unsafe fn invoke(handle: *mut WdRuntimeHandle, request: &str) -> serde_json::Value {
        let request = CString::new(request).unwrap();
        let raw = wd_invoke_json(handle, request.as_ptr());
        let text = CStr::from_ptr(raw).to_str().unwrap().to_string();
        wd_free_c_string(raw);
        serde_json::from_str(&text).unwrap()
    }

    #[test]
    fn round_trips_commands_through_the_c_abi() {
        unsafe {
            let config = CString::new(r#"{"inMemory":true,"logLevel":"warn"}"#).unwrap();
            let handle = wd_runtime_new(config.as_ptr());
            assert!(!handle.is_null());

            wd_set_event_callback(handle, Some(count_events), ptr::null_mut());
            let created = invoke(
                handle,
                r#"{"command":"create_profile","payload":{"name":"Alex"}}"#,
            );
            assert_eq!(created["ok"], true);
            assert_eq!(created["data"]["name"], "Alex");
            assert_eq!(EVENTS.load(Ordering::SeqCst), 1);

            let servers = invoke(handle, r#"{"command":"list_servers"}"#);
            assert_eq!(servers["data"].as_array().unwrap().len(), 4);

            wd_runtime_free(handle);
        }
    }

    #[test]
    fn rejects_bad_handles_and_configs() {
        unsafe {
            let response = invoke(ptr::null_mut(), r#"{"command":"list_servers"}"#);
            assert_eq!(response["error"]["code"], "invalid_handle");

            let config = CString::new("{not json").unwrap();
            assert!(wd_runtime_new(config.as_ptr()).is_null());

            wd_runtime_free(ptr::null_mut());
            wd_free_c_string(ptr::null_mut());
        }
    }
}
