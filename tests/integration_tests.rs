use anyhow::{ensure, Result};
use clkit::{
    buffer::Buffer,
    cl,
    config::BACKEND_VAR,
    context::Context,
    dev_container::DevContainer,
    devquery,
    memcheck,
    platform::Platform,
    profiler::Profiler,
    program::Program,
    queue::Queue,
    sampler::{Sampler, SamplerProperties},
    selector::{self, DeviceType, FilterChain, SamePlatform},
    wait_list,
};
use libtest_mimic::{Arguments, Trial};

fn main() {
    let mut args = Arguments::from_args();
    // tests share the wrapper index checked by memcheck
    args.test_threads = Some(1);
    if std::env::var_os(BACKEND_VAR).is_none() {
        clkit::runtime::install_host().unwrap();
    }
    println!("devices: {:#?}", selector::device_strings().unwrap());
    let tests = [
        trial("write_buffer", write_buffer),
        trial("empty_kernel", empty_kernel),
        trial("select_cpus", select_cpus),
        trial("sampler_per_platform", sampler_per_platform),
        trial("event_names", event_names),
        trial("wait_list_across_queues", wait_list_across_queues),
        trial("wrapper_identity", wrapper_identity),
        trial("profile_transfers", profile_transfers),
        trial("query_every_device", query_every_device),
    ];
    libtest_mimic::run(&args, tests.into()).exit()
}

fn trial(name: &'static str, f: fn() -> Result<()>) -> Trial {
    Trial::test(name, move || {
        f()?;
        if !memcheck() {
            return Err(format!("{name} leaked wrappers").into());
        }
        Ok(())
    })
}

fn first_device_context() -> Result<Context> {
    let devices = selector::all_devices()?;
    ensure!(!devices.is_empty(), "no devices");
    Ok(Context::from_devices(&devices[..1])?)
}

fn write_buffer() -> Result<()> {
    let context = first_device_context()?;
    let queue = Queue::builder(&context).build()?;
    let input = [1f32, -2., 3.5, 4.25];
    let buffer = Buffer::new(&context, cl::MEM_READ_WRITE, std::mem::size_of_val(&input))?;
    let event = buffer.write(&queue, 0, &input, None)?;
    event.wait()?;
    ensure!(event.command_type()? == cl::COMMAND_WRITE_BUFFER);
    ensure!(event.final_name()? == "WRITE_BUFFER");
    let mut output = [0f32; 4];
    buffer.read(&queue, 0, &mut output, None)?;
    ensure!(bits_eq(&input, &output));
    queue.finish()?;
    ensure!(queue.events().is_empty());
    Ok(())
}

fn bits_eq(a: &[f32], b: &[f32]) -> bool {
    a.iter().map(|x| x.to_bits()).eq(b.iter().map(|x| x.to_bits()))
}

fn empty_kernel() -> Result<()> {
    let context = Context::new_any()?;
    let program = Program::from_source(&context, "__kernel void k(){}")?;
    program.build("")?;
    let kernel = program.kernel("k")?;
    ensure!(kernel.num_args()? == 0);
    ensure!(kernel.function_name()? == "k");
    drop(kernel);
    drop(program);
    drop(context);
    ensure!(memcheck());
    Ok(())
}

fn select_cpus() -> Result<()> {
    let filters = FilterChain::new()
        .with_indep(DeviceType::CPU)
        .with_dep(SamePlatform);
    let devices = filters.select()?;
    ensure!(!devices.is_empty());
    let platform = devices[0].platform()?;
    for device in devices.iter() {
        ensure!(device.device_type()? & cl::DEVICE_TYPE_CPU != 0);
        ensure!(device.platform()? == platform);
    }
    ensure!(filters.select()? == devices);
    let context = Context::from_filters(FilterChain::new().with_indep(DeviceType::CPU))?;
    ensure!(context.all_devices()? == devices.as_slice());
    Ok(())
}

fn sampler_per_platform() -> Result<()> {
    let list = [
        cl::SAMPLER_NORMALIZED_COORDS as u64,
        0,
        cl::SAMPLER_ADDRESSING_MODE as u64,
        cl::ADDRESS_CLAMP_TO_EDGE as u64,
        cl::SAMPLER_FILTER_MODE as u64,
        cl::FILTER_NEAREST as u64,
        0,
    ];
    let expected = SamplerProperties::from_list(&list)?;
    for platform in Platform::all()? {
        let context = Context::from_devices(platform.all_devices()?)?;
        let sampler = Sampler::from_properties(&context, &list)?;
        ensure!(
            sampler.properties()? == expected,
            "{} returned {:?}",
            platform.name()?,
            sampler.properties()?
        );
    }
    Ok(())
}

fn event_names() -> Result<()> {
    let context = Context::new_any()?;
    let queue = Queue::builder(&context).build()?;
    let buffer = Buffer::from_slice(&context, cl::MEM_READ_WRITE, &[0u32; 16])?;
    let mapping = buffer.map(&queue, cl::MAP_READ, 0, 64, None)?;
    let event = mapping.event().clone();
    ensure!(event.final_name()? == "MAP_BUFFER");
    event.set_name("X");
    ensure!(event.final_name()? == "X");
    ensure!(event.name().as_deref() == Some("X"));
    let unmap = mapping.unmap(None)?;
    unmap.wait()?;
    ensure!(unmap.final_name()? == "UNMAP_MEM_OBJECT");
    Ok(())
}

fn wait_list_across_queues() -> Result<()> {
    let context = Context::new_any()?;
    let first = Queue::builder(&context).build()?;
    let second = Queue::builder(&context).build()?;
    let data: Vec<u32> = (0..64).collect();
    let src = Buffer::from_slice(&context, cl::MEM_READ_WRITE, &data)?;
    let dst = Buffer::new(&context, cl::MEM_READ_WRITE, 64 * 4)?;
    let fill = src.fill(&first, &[7u32], 0, 32 * 4, None)?;
    let mut list = wait_list![&fill];
    let copy = src.copy(&second, &dst, 0, 0, 64 * 4, Some(&mut list))?;
    ensure!(list.is_empty());
    let mut list = wait_list![&copy];
    list.wait()?;
    ensure!(list.is_empty());
    let mut output = vec![0u32; 64];
    dst.read(&second, 0, &mut output, None)?;
    ensure!(output[..32].iter().all(|x| *x == 7));
    ensure!(output[32..] == data[32..]);
    first.finish()?;
    second.finish()?;
    ensure!(first.events().is_empty() && second.events().is_empty());
    Ok(())
}

fn wrapper_identity() -> Result<()> {
    let context = Context::new_any()?;
    let queue = Queue::builder(&context).build()?;
    let buffer = Buffer::new(&context, cl::MEM_READ_ONLY, 16)?;
    let again = buffer.context()?;
    ensure!(again == context);
    ensure!(again.unwrap() == context.handle());
    ensure!(queue.context()? == context);
    let size = buffer.info(cl::MEM_SIZE)?;
    ensure!(std::sync::Arc::ptr_eq(&size, &buffer.info(cl::MEM_SIZE)?));
    ensure!(size.scalar::<usize>()? == 16);
    Ok(())
}

fn profile_transfers() -> Result<()> {
    let context = Context::new_any()?;
    let queue = Queue::builder(&context).profiling(true).build()?;
    let buffer = Buffer::new(&context, cl::MEM_READ_WRITE, 4096)?;
    let mut profiler = Profiler::new();
    profiler.start();
    buffer.fill(&queue, &[0u8], 0, 4096, None)?.set_name("clear");
    for _ in 0..3 {
        buffer.write(&queue, 0, &[1u32; 1024], None)?;
    }
    profiler.add_queue("main", &queue);
    profiler.stop();
    let profile = profiler.calc()?;
    ensure!(profile.infos().len() == 4);
    ensure!(profile.aggregates().len() == 2);
    let writes = profile
        .aggregate("WRITE_BUFFER")
        .ok_or_else(|| anyhow::anyhow!("no WRITE_BUFFER aggregate"))?;
    ensure!(writes.absolute_time > 0);
    ensure!(profile.summary().contains("WRITE_BUFFER"));
    Ok(())
}

fn query_every_device() -> Result<()> {
    for device in selector::all_devices()? {
        ensure!(devquery::query(&device, "cl_device_name")? == device.name()?);
        let described = devquery::describe(&device);
        ensure!(described.len() > 20, "{} answered {} entries", device.name()?, described.len());
        for entry in devquery::prefix("max_work") {
            ensure!(described.iter().any(|(known, _)| known.param == entry.param));
        }
    }
    Ok(())
}
