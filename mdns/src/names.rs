//! Construction and validation of the local `.local.` names the engine
//! answers for and publishes.

use shared::error::*;

const LOCAL_DOMAIN: &str = "local.";

const MAX_LABEL_LEN: usize = 63;

// RFC 6763 limits the service label (without the underscore) to 15 bytes.
const MAX_SERVICE_LABEL_LEN: usize = 16;

/// `"alpha"` -> `"alpha.local."`
pub fn local_host_full_name(host_name: &str) -> Result<String> {
    check_host_label(host_name)?;
    Ok(format!("{host_name}.{LOCAL_DOMAIN}"))
}

/// `"_printer._tcp"` -> `"_printer._tcp.local."`
pub fn local_service_full_name(service_name: &str) -> Result<String> {
    check_service_name(service_name)?;
    Ok(format!("{service_name}.{LOCAL_DOMAIN}"))
}

/// `("lp1", "_printer._tcp")` -> `"lp1._printer._tcp.local."`
pub fn local_instance_full_name(instance_name: &str, service_name: &str) -> Result<String> {
    check_instance_label(instance_name)?;
    check_service_name(service_name)?;
    Ok(format!("{instance_name}.{service_name}.{LOCAL_DOMAIN}"))
}

/// A host name is a single DNS label.
pub fn check_host_label(host_name: &str) -> Result<()> {
    if host_name.is_empty() {
        return Err(Error::ErrHostnameEmpty);
    }
    if host_name.len() > MAX_LABEL_LEN
        || host_name.contains('.')
        || host_name.bytes().any(|b| b.is_ascii_control())
    {
        return Err(Error::ErrInvalidHostName(host_name.to_owned()));
    }
    Ok(())
}

/// A service name is `_<label>._tcp` or `_<label>._udp`.
pub fn check_service_name(service_name: &str) -> Result<()> {
    let err = || Error::ErrInvalidServiceName(service_name.to_owned());

    let prefix = service_name
        .strip_suffix("._tcp")
        .or_else(|| service_name.strip_suffix("._udp"))
        .ok_or_else(err)?;

    let label = prefix.strip_prefix('_').ok_or_else(err)?;
    if label.is_empty()
        || label.len() > MAX_SERVICE_LABEL_LEN - 1
        || label.contains('.')
        || label.bytes().any(|b| b.is_ascii_control())
    {
        return Err(err());
    }
    Ok(())
}

/// An instance name is a single label as well, but may contain spaces and
/// most printable characters ("my printer (2)").
pub fn check_instance_label(instance_name: &str) -> Result<()> {
    if instance_name.is_empty()
        || instance_name.len() > MAX_LABEL_LEN
        || instance_name.contains('.')
        || instance_name.bytes().any(|b| b.is_ascii_control())
    {
        return Err(Error::ErrInvalidInstanceName(instance_name.to_owned()));
    }
    Ok(())
}

/// Splits the instance label back off a full instance name
/// (`"lp1._printer._tcp.local."` -> `"lp1"`).
pub(crate) fn instance_label(instance_full_name: &str) -> &str {
    instance_full_name
        .split_once('.')
        .map(|(label, _)| label)
        .unwrap_or(instance_full_name)
}
