#![no_std]
#![no_main]

// Required for ESP-IDF bootloader compatibility
// Use explicit parameters to ensure correct efuse block revision values
esp_bootloader_esp_idf::esp_app_desc!(
    env!("CARGO_PKG_VERSION"),  // version
    env!("CARGO_PKG_NAME"),     // project_name
    "00:00:00",                 // build_time
    "2025-01-01",               // build_date
    "0.0.0",                    // idf_ver (not using IDF)
    0x10000,                    // mmu_page_size (64KB)
    0,                          // min_efuse_blk_rev_full (accept all)
    u16::MAX                    // max_efuse_blk_rev_full (accept all)
);

use embassy_executor::Spawner;
use embassy_time::Duration;
use embassy_usb::class::cdc_acm::{CdcAcmClass, State};
use embassy_usb::{Builder, UsbDevice};
use esp_backtrace as _;
use esp_hal::otg_fs::asynch::{Config as UsbDriverConfig, Driver};
use esp_hal::otg_fs::Usb;
use esp_hal::timer::timg::TimerGroup;
use static_cell::{ConstStaticCell, StaticCell};

use cdc_log_firmware::config;
use cdc_log_firmware::config::pipeline::{QUEUE_CAPACITY, STARTUP_TAG};
use cdc_log_firmware::logger::CdcLogger;
use cdc_log_firmware::pipeline::{LogPipeline, PipelineSettings, QueueConsumer};
use cdc_log_firmware::tasks;
use cdc_log_firmware::usb::{CdcReader, CdcWriter};

/// Type alias for the USB OTG driver
type UsbDriver = Driver<'static>;

/// Type alias for the firmware's log pipeline
type Pipeline = LogPipeline<QUEUE_CAPACITY>;

/// Static executor for embassy
static EXECUTOR: StaticCell<esp_rtos::embassy::Executor> = StaticCell::new();

/// Process-wide pipeline context, shared by every producer and the drain task
static PIPELINE: ConstStaticCell<Pipeline> =
    ConstStaticCell::new(LogPipeline::new(PipelineSettings::DEFAULT));

/// Backend for the `log` facade
static LOGGER: StaticCell<CdcLogger<'static, QUEUE_CAPACITY>> = StaticCell::new();

/// USB buffers (must outlive the USB device)
static EP_OUT_BUFFER: StaticCell<[u8; 1024]> = StaticCell::new();
static CONFIG_DESCRIPTOR: StaticCell<[u8; 256]> = StaticCell::new();
static BOS_DESCRIPTOR: StaticCell<[u8; 256]> = StaticCell::new();
static CONTROL_BUF: StaticCell<[u8; 64]> = StaticCell::new();
static CDC_STATE: StaticCell<State> = StaticCell::new();

#[esp_hal::main]
fn main() -> ! {
    // Heap for chunk storage
    esp_alloc::heap_allocator!(size: config::heap::SIZE);

    let peripherals = esp_hal::init(esp_hal::Config::default());

    // Initialise the RTOS scheduler with timer - MUST be done before any async operations
    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);

    // The pipeline must exist before anything logs
    let pipeline: &'static Pipeline = PIPELINE.take();
    let logger: &'static CdcLogger<'static, QUEUE_CAPACITY> =
        LOGGER.init(CdcLogger::new(pipeline, config::pipeline::LOG_LEVEL));
    logger.install().expect("logger already installed");

    let consumer = pipeline
        .queue()
        .take_consumer()
        .expect("queue consumer already taken");

    pipeline.try_log(STARTUP_TAG, format_args!("USB initialization"));

    // Configure USB OTG driver
    let usb = Usb::new(peripherals.USB0, peripherals.GPIO20, peripherals.GPIO19);
    let driver = Driver::new(usb, EP_OUT_BUFFER.init([0; 1024]), UsbDriverConfig::default());

    let mut usb_config = embassy_usb::Config::new(config::usb::VID, config::usb::PID);
    usb_config.manufacturer = Some(config::usb::MANUFACTURER);
    usb_config.product = Some(config::usb::PRODUCT);
    usb_config.serial_number = Some(config::usb::SERIAL_NUMBER);
    usb_config.max_power = config::usb::MAX_POWER_MA;
    usb_config.max_packet_size_0 = 64;

    let mut builder = Builder::new(
        driver,
        usb_config,
        CONFIG_DESCRIPTOR.init([0; 256]),
        BOS_DESCRIPTOR.init([0; 256]),
        &mut [],
        CONTROL_BUF.init([0; 64]),
    );

    // Create CDC-ACM class (USB serial)
    let class = CdcAcmClass::new(&mut builder, CDC_STATE.init(State::new()), config::usb::MAX_PACKET_SIZE);
    let usb_device = builder.build();
    let (sender, receiver) = class.split();

    pipeline.try_log(STARTUP_TAG, format_args!("USB initialization DONE"));

    // Create and run the embassy executor
    let executor = EXECUTOR.init(esp_rtos::embassy::Executor::new());
    executor.run(|spawner| {
        spawner.must_spawn(async_main(
            spawner,
            pipeline,
            consumer,
            usb_device,
            CdcWriter::new(sender),
            CdcReader::new(receiver),
        ));
    })
}

#[embassy_executor::task]
async fn async_main(
    spawner: Spawner,
    pipeline: &'static Pipeline,
    consumer: QueueConsumer<'static, QUEUE_CAPACITY>,
    usb_device: UsbDevice<'static, UsbDriver>,
    writer: CdcWriter<'static, UsbDriver>,
    reader: CdcReader<'static, UsbDriver>,
) {
    // Spawn tasks
    spawner.spawn(usb_task(usb_device)).unwrap();
    spawner.spawn(cdc_drain_task(consumer, writer)).unwrap();
    spawner.spawn(cdc_rx_task(pipeline, reader)).unwrap();
    spawner.spawn(heartbeat_task(pipeline)).unwrap();

    log::info!("tasks started");
}

/// Task that runs the USB device stack
#[embassy_executor::task]
async fn usb_task(mut usb: UsbDevice<'static, UsbDriver>) -> ! {
    usb.run().await
}

/// Task that writes queued chunks to the CDC port
#[embassy_executor::task]
async fn cdc_drain_task(
    consumer: QueueConsumer<'static, QUEUE_CAPACITY>,
    writer: CdcWriter<'static, UsbDriver>,
) -> ! {
    let startup_delay = Duration::from_millis(config::tasks::DRAIN_STARTUP_DELAY_MS);
    tasks::drain_task(consumer, writer, startup_delay).await
}

/// Task that feeds received CDC data into the pipeline
#[embassy_executor::task]
async fn cdc_rx_task(pipeline: &'static Pipeline, reader: CdcReader<'static, UsbDriver>) -> ! {
    tasks::rx_task(pipeline, reader).await
}

/// Task that logs a periodic heartbeat
#[embassy_executor::task]
async fn heartbeat_task(pipeline: &'static Pipeline) -> ! {
    let period = Duration::from_millis(config::tasks::BACKGROUND_PERIOD_MS);
    tasks::background_task(pipeline, period).await
}
