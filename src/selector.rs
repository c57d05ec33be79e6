/*!
Device selection.

A [`FilterChain`] is evaluated over all devices of all platforms in two stages:
1. Independent filters ([`IndepFilter`]) accept or reject each device on its own. A device is
kept if every independent filter accepts it.
2. Dependent filters ([`DepFilter`]) then transform the surviving set, in chain order.

```
# use clkit::selector::{DeviceType, FilterChain, SamePlatform};
# fn main() -> clkit::result::Result<()> {
# clkit::runtime::install_host().ok();
let devices = FilterChain::new()
    .with_indep(DeviceType::CPU)
    .with_dep(SamePlatform)
    .select()?;
for device in devices.iter() {
    assert!(device.is_type(clkit::cl::DEVICE_TYPE_CPU)?);
}
# Ok(())
# }
```

Closures are filters too:
```
# use clkit::{device::Device, result::Result, selector::FilterChain};
# fn main() -> Result<()> {
# clkit::runtime::install_host().ok();
let devices = FilterChain::new()
    .with_indep(|device: &Device| -> Result<bool> { Ok(device.max_compute_units()? >= 8) })
    .with_dep(|mut devices: Vec<Device>| -> Result<Vec<Device>> {
        devices.reverse();
        Ok(devices)
    })
    .select()?;
# Ok(())
# }
```
*/

use crate::{
    cl,
    dev_container::DevContainer,
    device::Device,
    error::Error,
    platform::Platform,
    result::Result,
    version::ApiVersion,
};
use parking_lot::Mutex;
use std::{
    fmt::{self, Debug},
    io::{self, BufRead, BufReader, Write},
};

/// A filter that accepts or rejects a single device.
pub trait IndepFilter: Send + Sync {
    fn accept(&self, device: &Device) -> Result<bool>;
}

impl<F> IndepFilter for F
where
    F: Fn(&Device) -> Result<bool> + Send + Sync,
{
    fn accept(&self, device: &Device) -> Result<bool> {
        self(device)
    }
}

/// A filter that transforms a set of devices.
pub trait DepFilter: Send + Sync {
    fn filter(&self, devices: Vec<Device>) -> Result<Vec<Device>>;
    #[doc(hidden)]
    fn is_same_platform(&self) -> bool {
        false
    }
}

impl<F> DepFilter for F
where
    F: Fn(Vec<Device>) -> Result<Vec<Device>> + Send + Sync,
{
    fn filter(&self, devices: Vec<Device>) -> Result<Vec<Device>> {
        self(devices)
    }
}

enum Filter {
    Indep(Box<dyn IndepFilter>),
    Dep(Box<dyn DepFilter>),
}

/// An ordered chain of filters.
#[derive(Default)]
pub struct FilterChain {
    filters: Vec<Filter>,
}

impl FilterChain {
    pub fn new() -> Self {
        Self::default()
    }
    /// Appends an independent filter.
    pub fn add_indep(&mut self, filter: impl IndepFilter + 'static) -> &mut Self {
        self.filters.push(Filter::Indep(Box::new(filter)));
        self
    }
    /// Appends a dependent filter.
    pub fn add_dep(&mut self, filter: impl DepFilter + 'static) -> &mut Self {
        self.filters.push(Filter::Dep(Box::new(filter)));
        self
    }
    /// Appends an independent filter.
    pub fn with_indep(mut self, filter: impl IndepFilter + 'static) -> Self {
        self.add_indep(filter);
        self
    }
    /// Appends a dependent filter.
    pub fn with_dep(mut self, filter: impl DepFilter + 'static) -> Self {
        self.add_dep(filter);
        self
    }
    /// The number of filters.
    pub fn len(&self) -> usize {
        self.filters.len()
    }
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
    /// Appends [`SamePlatform`] unless the last filter already is one.
    pub fn ensure_same_platform(&mut self) {
        let ends_with_same_platform = matches!(
            self.filters.last(),
            Some(Filter::Dep(filter)) if filter.is_same_platform()
        );
        if !ends_with_same_platform {
            self.add_dep(SamePlatform);
        }
    }
    /// Evaluates the chain over all devices.
    ///
    /// The chain is not modified, so selecting twice yields the same devices unless a filter
    /// is interactive.
    pub fn select(&self) -> Result<Vec<Device>> {
        self.select_from(all_devices()?)
    }
    /// Evaluates the chain over `devices`.
    pub fn select_from(&self, devices: Vec<Device>) -> Result<Vec<Device>> {
        let mut selected = Vec::with_capacity(devices.len());
        'devices: for device in devices {
            for filter in self.filters.iter() {
                if let Filter::Indep(filter) = filter {
                    if !filter.accept(&device)? {
                        continue 'devices;
                    }
                }
            }
            selected.push(device);
        }
        for filter in self.filters.iter() {
            if selected.is_empty() {
                break;
            }
            if let Filter::Dep(filter) = filter {
                selected = filter.filter(selected)?;
            }
        }
        log::debug!("selected {} devices", selected.len());
        Ok(selected)
    }
}

impl Debug for FilterChain {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let filters: Vec<_> = self
            .filters
            .iter()
            .map(|filter| match filter {
                Filter::Indep(_) => "indep",
                Filter::Dep(filter) if filter.is_same_platform() => "same platform",
                Filter::Dep(_) => "dep",
            })
            .collect();
        f.debug_struct("FilterChain")
            .field("filters", &filters)
            .finish()
    }
}

/// Evaluates `filters` over all devices, see [`FilterChain::select`].
///
/// Unlike [`Context::from_filters`](crate::context::Context::from_filters), no
/// [`SamePlatform`] filter is appended.
pub fn select(filters: &FilterChain) -> Result<Vec<Device>> {
    filters.select()
}

/// All devices of all platforms, in platform order.
pub fn all_devices() -> Result<Vec<Device>> {
    let mut devices = Vec::new();
    for platform in Platform::all()? {
        devices.extend(platform.all_devices()?.iter().cloned());
    }
    Ok(devices)
}

/// Describes each device as `"<index>. <device name> [<platform name>]"`.
pub fn describe_devices(devices: &[Device]) -> Result<Vec<String>> {
    devices
        .iter()
        .enumerate()
        .map(|(i, device)| {
            Ok(format!(
                "{i}. {} [{}]",
                device.name()?,
                device.platform()?.name()?
            ))
        })
        .collect()
}

/// Describes all devices, see [`describe_devices`].
pub fn device_strings() -> Result<Vec<String>> {
    describe_devices(&all_devices()?)
}

/// Prints [`device_strings`] to stdout, one per line.
pub fn print_device_strings() -> Result<()> {
    for line in device_strings()? {
        println!("{line}");
    }
    Ok(())
}

/// Accepts devices of a type.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct DeviceType(pub u64);

impl DeviceType {
    pub const CPU: Self = Self(cl::DEVICE_TYPE_CPU);
    pub const GPU: Self = Self(cl::DEVICE_TYPE_GPU);
    pub const ACCELERATOR: Self = Self(cl::DEVICE_TYPE_ACCELERATOR);
    pub const DEFAULT: Self = Self(cl::DEVICE_TYPE_DEFAULT);
    pub const ALL: Self = Self(cl::DEVICE_TYPE_ALL);
}

impl IndepFilter for DeviceType {
    fn accept(&self, device: &Device) -> Result<bool> {
        device.is_type(self.0)
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Accepts devices whose vendor contains a string, ignoring case.
#[derive(Clone, Debug)]
pub struct Vendor(String);

impl Vendor {
    pub fn new(vendor: impl Into<String>) -> Self {
        Self(vendor.into())
    }
}

impl IndepFilter for Vendor {
    fn accept(&self, device: &Device) -> Result<bool> {
        Ok(contains_ignore_case(&device.vendor()?, &self.0))
    }
}

/// Accepts devices whose name contains a string, ignoring case.
#[derive(Clone, Debug)]
pub struct Name(String);

impl Name {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

impl IndepFilter for Name {
    fn accept(&self, device: &Device) -> Result<bool> {
        Ok(contains_ignore_case(&device.name()?, &self.0))
    }
}

/// Accepts devices whose name, vendor or platform name contains a string, ignoring case.
#[derive(Clone, Debug)]
pub struct AnyString(String);

impl AnyString {
    pub fn new(string: impl Into<String>) -> Self {
        Self(string.into())
    }
}

impl IndepFilter for AnyString {
    fn accept(&self, device: &Device) -> Result<bool> {
        Ok(contains_ignore_case(&device.name()?, &self.0)
            || contains_ignore_case(&device.vendor()?, &self.0)
            || contains_ignore_case(&device.platform()?.name()?, &self.0))
    }
}

/// Accepts devices of a platform.
#[derive(Clone, Debug)]
pub struct OnPlatform(pub Platform);

impl IndepFilter for OnPlatform {
    fn accept(&self, device: &Device) -> Result<bool> {
        Ok(device.platform()? == self.0)
    }
}

/// Accepts devices with at least an API version.
#[derive(Clone, Copy, Debug)]
pub struct MinVersion(pub ApiVersion);

impl IndepFilter for MinVersion {
    fn accept(&self, device: &Device) -> Result<bool> {
        Ok(device.api_version()? >= self.0)
    }
}

/// Keeps the devices of one platform, the platform with the most devices.
///
/// Ties go to the platform that appears first.
#[derive(Clone, Copy, Debug, Default)]
pub struct SamePlatform;

impl DepFilter for SamePlatform {
    fn filter(&self, devices: Vec<Device>) -> Result<Vec<Device>> {
        let platforms = devices
            .iter()
            .map(Device::platform)
            .collect::<Result<Vec<_>>>()?;
        let mut counts: Vec<(&Platform, usize)> = Vec::new();
        for platform in platforms.iter() {
            match counts.iter_mut().find(|(x, _)| *x == platform) {
                Some((_, count)) => *count += 1,
                None => counts.push((platform, 1)),
            }
        }
        let mut best: Option<(&Platform, usize)> = None;
        for (platform, count) in counts {
            if best.map_or(true, |(_, best_count)| count > best_count) {
                best = Some((platform, count));
            }
        }
        let best = match best {
            Some((platform, _)) => platform.clone(),
            None => return Ok(devices),
        };
        Ok(devices
            .into_iter()
            .zip(platforms.iter())
            .filter(|(_, platform)| **platform == best)
            .map(|(device, _)| device)
            .collect())
    }
    fn is_same_platform(&self) -> bool {
        true
    }
}

/// Keeps the device at an index.
///
/// **errors**
/// - [`OutOfRange`](crate::error::ErrorKind::OutOfRange): There is no device at the index.
#[derive(Clone, Copy, Debug)]
pub struct IndexSelect(pub usize);

impl DepFilter for IndexSelect {
    fn filter(&self, mut devices: Vec<Device>) -> Result<Vec<Device>> {
        if self.0 >= devices.len() {
            return Err(Error::out_of_range(format!(
                "no device found at index {}, {} devices are available",
                self.0,
                devices.len()
            )));
        }
        Ok(vec![devices.swap_remove(self.0)])
    }
}

/// Keeps the first devices.
#[derive(Clone, Copy, Debug)]
pub struct TopN(pub usize);

impl DepFilter for TopN {
    fn filter(&self, mut devices: Vec<Device>) -> Result<Vec<Device>> {
        devices.truncate(self.0);
        Ok(devices)
    }
}

/// Keeps one device, chosen from a menu.
///
/// The devices are listed on the output. A valid preselected index is marked and used,
/// otherwise the user is asked for an index until a valid one is entered. A single device is
/// selected without asking.
pub struct Menu {
    index: Option<usize>,
    input: Mutex<Box<dyn BufRead + Send>>,
    output: Mutex<Box<dyn Write + Send>>,
}

impl Menu {
    /// A menu on stdin and stdout.
    pub fn new() -> Self {
        Self::with_io(BufReader::new(io::stdin()), io::stdout())
    }
    /// A menu on stdin and stdout that selects `index` if it is valid.
    pub fn with_index(index: usize) -> Self {
        Self {
            index: Some(index),
            ..Self::new()
        }
    }
    /// A menu reading choices from `input` and printing to `output`.
    pub fn with_io(input: impl BufRead + Send + 'static, output: impl Write + Send + 'static) -> Self {
        Self {
            index: None,
            input: Mutex::new(Box::new(input)),
            output: Mutex::new(Box::new(output)),
        }
    }
    /// Preselects `index`.
    pub fn index(self, index: usize) -> Self {
        Self {
            index: Some(index),
            ..self
        }
    }
    fn list(&self, lines: &[String], selected: Option<usize>) -> io::Result<()> {
        let mut output = self.output.lock();
        writeln!(output)?;
        for (i, line) in lines.iter().enumerate() {
            let mark = if selected == Some(i) { "(*)" } else { "   " };
            writeln!(output, " {mark} {line}")?;
        }
        output.flush()
    }
    fn query(&self, lines: &[String]) -> Result<usize> {
        let io_error = |e: io::Error| Error::internal(format!("device menu: {e}"));
        {
            let mut output = self.output.lock();
            write!(output, "\nList of available devices:").map_err(io_error)?;
        }
        self.list(lines, None).map_err(io_error)?;
        if lines.len() == 1 {
            return Ok(0);
        }
        let last = lines.len() - 1;
        let mut input = self.input.lock();
        loop {
            {
                let mut output = self.output.lock();
                write!(output, "\n (?) Select device (0-{last}) > ").map_err(io_error)?;
                output.flush().map_err(io_error)?;
            }
            let mut line = String::new();
            if input.read_line(&mut line).map_err(io_error)? == 0 {
                return Err(Error::invalid_argument("device menu input closed without a choice"));
            }
            match line.trim().parse::<usize>() {
                Ok(index) if index <= last => return Ok(index),
                _ => {
                    let mut output = self.output.lock();
                    writeln!(output, " (!) Invalid choice, please insert a value between 0 and {last}.")
                        .map_err(io_error)?;
                }
            }
        }
    }
}

impl Default for Menu {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for Menu {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Menu").field("index", &self.index).finish()
    }
}

impl DepFilter for Menu {
    fn filter(&self, mut devices: Vec<Device>) -> Result<Vec<Device>> {
        let lines = describe_devices(&devices)?;
        let io_error = |e: io::Error| Error::internal(format!("device menu: {e}"));
        let preselected = match self.index {
            Some(index) if index < devices.len() => {
                self.list(&lines, Some(index)).map_err(io_error)?;
                Some(index)
            }
            Some(index) => {
                let mut output = self.output.lock();
                writeln!(output, "\n   (!) No device at index {index}!").map_err(io_error)?;
                None
            }
            None => None,
        };
        let index = match preselected {
            Some(index) => index,
            None => self.query(&lines)?,
        };
        Ok(vec![devices.swap_remove(index)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{io::Cursor, sync::Arc};

    #[derive(Clone, Default)]
    struct Output(Arc<Mutex<Vec<u8>>>);

    impl Write for Output {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Output {
        fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.lock()).to_string()
        }
    }

    fn names(devices: &[Device]) -> Vec<String> {
        devices.iter().map(|device| device.name().unwrap()).collect()
    }

    #[test]
    fn two_stages() {
        let _guard = crate::test_lock();
        let chain = FilterChain::new()
            .with_dep(TopN(1))
            .with_indep(DeviceType::CPU);
        // independent filters run before dependent filters regardless of order
        assert_eq!(names(&chain.select().unwrap()), ["clkit host CPU"]);
        let cpus = FilterChain::new()
            .with_indep(DeviceType::CPU)
            .with_dep(SamePlatform)
            .select()
            .unwrap();
        assert_eq!(
            names(&cpus),
            ["Host Labs CPU", "Host Labs CPU (second socket)"]
        );
        assert_eq!(names(&chain.select().unwrap()), names(&chain.select().unwrap()));
    }

    #[test]
    fn same_platform_ties() {
        let _guard = crate::test_lock();
        let chain = FilterChain::new()
            .with_indep(DeviceType::DEFAULT)
            .with_dep(SamePlatform);
        assert_eq!(names(&chain.select().unwrap()), ["clkit host GPU"]);
    }

    #[test]
    fn string_filters() {
        let _guard = crate::test_lock();
        let select = |chain: FilterChain| names(&chain.select().unwrap());
        assert_eq!(
            select(FilterChain::new().with_indep(Name::new("ACCEL"))),
            ["Host Labs Accelerator"]
        );
        assert_eq!(select(FilterChain::new().with_indep(Vendor::new("clkit"))).len(), 2);
        assert_eq!(select(FilterChain::new().with_indep(AnyString::new("host 2.0"))).len(), 3);
        assert_eq!(
            select(FilterChain::new().with_indep(AnyString::new("gpu"))),
            ["clkit host GPU"]
        );
        assert_eq!(
            select(FilterChain::new().with_indep(MinVersion(ApiVersion::new(2, 0)))).len(),
            3
        );
        let platform = Platform::all().unwrap().remove(0);
        assert_eq!(
            select(FilterChain::new().with_indep(OnPlatform(platform))),
            ["clkit host GPU", "clkit host CPU"]
        );
    }

    #[test]
    fn index_select() {
        let _guard = crate::test_lock();
        let devices = FilterChain::new().with_dep(IndexSelect(3)).select().unwrap();
        assert_eq!(names(&devices), ["Host Labs Accelerator"]);
        let error = FilterChain::new().with_dep(IndexSelect(5)).select().unwrap_err();
        assert!(error.kind().is_out_of_range());
    }

    #[test]
    fn menu() {
        let _guard = crate::test_lock();
        let output = Output::default();
        let menu = Menu::with_io(Cursor::new("x\n9\n2\n"), output.clone());
        let devices = FilterChain::new().with_dep(menu).select().unwrap();
        assert_eq!(names(&devices), ["Host Labs CPU"]);
        let text = output.text();
        assert!(text.contains("0. clkit host GPU [clkit host 1.2]"));
        assert_eq!(text.matches("(!) Invalid choice").count(), 2);

        let output = Output::default();
        let menu = Menu::with_io(Cursor::new(""), output.clone()).index(1);
        let devices = FilterChain::new().with_dep(menu).select().unwrap();
        assert_eq!(names(&devices), ["clkit host CPU"]);
        assert!(output.text().contains(" (*) 1. clkit host CPU"));

        let menu = Menu::with_io(Cursor::new(""), Output::default()).index(7);
        let error = FilterChain::new().with_dep(menu).select().unwrap_err();
        assert!(error.kind().is_invalid_argument());
    }

    #[test]
    fn device_strings_all() {
        let _guard = crate::test_lock();
        let strings = device_strings().unwrap();
        assert_eq!(strings.len(), 5);
        assert_eq!(strings[4], "4. Host Labs CPU (second socket) [clkit host 2.0]");
    }
}
