//! Time-Slotted Channel Hopping.
//!
//! A single cooperative task owns all TSCH behavior of an interface: it
//! sleeps until the next active link's timeslot, hops to the link's
//! channel and performs the TX or RX operation of the slot at
//! sub-microsecond offsets derived from the timeslot template. Slot
//! deadlines come from the network uptime reference; the task never
//! polls.
//!
//! Slot-local failures (busy channel, missing packet, contended lock)
//! skip the slot and move on; structural failures (empty schedule, no
//! hopping sequence) are logged but do not stop the state machine.

pub mod neighbor;
pub mod schedule;

pub use neighbor::NeighborTable;
pub use schedule::{
    Asn, HoppingSequence, NextActiveLink, ScheduleStore, TschLink, TschSlotframe,
};

use core::cell::RefCell;

use embedded_hal_async::delay::DelayNs;
use mac154_frame::{Address, SecurityLevel};

use crate::mac::{
    create_enh_beacon, filter, incoming_security_procedure, parse_mac_payload, parse_mhr,
    CcmStar, DeviceRole, MacContext, BROADCAST_ADDRESS,
};
use crate::net_time::{NetTime, NetTimeReference, NetTimeTimer, Rounding, NSEC_PER_USEC};
use crate::phy::{Config, Driver, FrameBuffer, HwCapabilities};
use crate::sync::{Channel, Mutex};
use crate::{Error, Result};

/// A network management request, see the SET/GET attribute surface of
/// section 8.2.19.5 and 9.5.
pub enum MgmtRequest<'a> {
    /// Request acknowledgment of outgoing unicast frames.
    SetAck,
    /// Stop requesting acknowledgment of outgoing frames.
    UnsetAck,
    /// Tune to the given channel.
    SetChannel(u16),
    /// Set the PAN identifier.
    SetPanId(u16),
    /// Set the short address.
    SetShortAddr(u16),
    /// Set the transmission power in dBm.
    SetTxPower(i16),
    /// Set the device role.
    SetDeviceRole(DeviceRole),
    /// Configure frame security.
    SetSecuritySettings {
        /// The security level.
        level: SecurityLevel,
        /// The 16-octet key.
        key: &'a [u8],
    },
    /// Install or replace a slotframe.
    SetTschSlotframe {
        /// The slotframe handle.
        handle: u8,
        /// The slotframe size in timeslots.
        size: u16,
        /// Whether the slotframe is advertised in beacons.
        advertise: bool,
    },
    /// Install or replace a link.
    SetTschLink(TschLink),
    /// Install a channel hopping sequence.
    SetHoppingSequence(&'a [u16]),
    /// Turn TSCH mode on or off.
    SetTschMode(bool),
    /// Query the device role.
    GetDeviceRole,
}

/// The response to a [`MgmtRequest`].
#[derive(Debug, PartialEq, Eq)]
pub enum MgmtResponse {
    /// The request was applied.
    Done,
    /// The queried device role.
    DeviceRole(DeviceRole),
}

/// The verdict of the TSCH RX correlation, see section 6.5.4.3.
#[derive(Debug, PartialEq, Eq)]
pub enum RxVerdict {
    /// The frame belongs to the active RX link; continue processing and
    /// report the given time correction (in microseconds) in the
    /// enhanced acknowledgment.
    Continue(i32),
    /// The frame does not belong to the current slot; drop it.
    Drop,
}

/// Slot state shared between the state machine and the RX path.
#[derive(Default)]
struct SlotContext {
    /// The link operated in the current slot; `None` outside slots.
    current_link: Option<TschLink>,
    /// The programmed TX time, or the expected RX time, of the slot.
    programmed_tx_rx_time: Option<NetTime>,
    /// The network time the slot timer was actually programmed to.
    programmed_expiry: NetTime,
}

fn div_round_closest(n: i64, d: i64) -> i64 {
    if n >= 0 {
        (n + d / 2) / d
    } else {
        (n - d / 2) / d
    }
}

/// The TSCH state machine of one interface.
///
/// The instance owns the driver and the MAC context; the network uptime
/// reference is shared with the driver and lives outside both.
pub struct TschMac<'r, D: Driver, C: CcmStar, TIMER: DelayNs> {
    driver: RefCell<D>,
    time: &'r NetTimeReference<D::Sleep, D::HighRes>,
    ctx: Mutex<MacContext<C>>,
    /// Guards scanning and mode transitions.
    scan_lock: Mutex<()>,
    neighbors: RefCell<NeighborTable>,
    slot: RefCell<SlotContext>,
    slot_timer: NetTimeTimer,
    delay: RefCell<TIMER>,
    /// Validated received frames awaiting the upper layer.
    rx: Channel<FrameBuffer>,
}

const TSCH_REQUIRED_HW_CAPS: HwCapabilities =
    HwCapabilities::TIMED_TX.union(HwCapabilities::TIMED_RX);

impl<'r, D, C, TIMER> TschMac<'r, D, C, TIMER>
where
    D: Driver,
    C: CcmStar,
    TIMER: DelayNs,
{
    /// Create the TSCH state machine for an interface.
    ///
    /// Selects the band-dependent default timeslot template from the
    /// driver's channel page, see section 8.4.3.3.4, table 8-99.
    pub fn new(
        driver: D,
        time: &'r NetTimeReference<D::Sleep, D::HighRes>,
        mut ctx: MacContext<C>,
        timer: TIMER,
    ) -> Self {
        let page = driver.channel_page();
        let sub_ghz_channels =
            driver.verify_channel(0) || driver.verify_channel(1);

        ctx.tsch.timeslot_template = if page.is_sub_ghz(sub_ghz_channels) {
            mac154_frame::TschTimeslotTimings::DEFAULT_SUB_GHZ
        } else {
            mac154_frame::TschTimeslotTimings::DEFAULT_2450_MHZ
        };

        Self {
            driver: RefCell::new(driver),
            time,
            ctx: Mutex::new(ctx),
            scan_lock: Mutex::new(()),
            neighbors: RefCell::new(NeighborTable::new()),
            slot: RefCell::new(SlotContext::default()),
            slot_timer: NetTimeTimer::new(),
            delay: RefCell::new(timer),
            rx: Channel::new(),
        }
    }

    /// The MAC context of the interface.
    pub fn context(&self) -> &Mutex<MacContext<C>> {
        &self.ctx
    }

    /// Queue a frame for transmission to the given neighbor.
    pub fn enqueue_tx(&self, dst: Address, frame: FrameBuffer) -> Result<()> {
        self.neighbors.borrow_mut().enqueue(dst, frame)
    }

    /// Wait for the next validated received frame.
    pub async fn received(&self) -> FrameBuffer {
        self.rx.receive().await
    }

    /// The complete ingress path for a frame delivered by the driver.
    ///
    /// Parses and repairs the MAC header, filters on addressing and
    /// role, runs the incoming security procedure, validates the MAC
    /// payload, correlates the frame with the active TSCH slot and
    /// finally hands it to the upper layer.
    ///
    /// # Errors
    ///
    /// `Invalid` for malformed frames, `Security` for failed
    /// unsecuring, `NoData` for frames filtered or dropped by slot
    /// correlation. All of these simply drop the frame.
    pub async fn rx_frame(&self, mut frame: FrameBuffer) -> Result<()> {
        let timestamp = frame.timestamp;
        let len = frame.len;

        let (src_addr, tsch_mode) = {
            let mut ctx = self.ctx.lock().await;

            let (src_addr, mac_payload_offset) = {
                let buffer = &mut frame.buffer[..len];
                let parsed = parse_mhr(buffer)?;

                if !filter(&ctx, &parsed) {
                    debug!("frame filtered");
                    return Err(Error::NoData);
                }

                let fc = parsed.frame_control();
                let src_addr = parsed.addressing().and_then(|af| af.src_address(&fc));
                let offset = len - parsed.mac_payload().map_or(0, |p| p.len());
                (src_addr, offset)
            };

            let tsch_mode = ctx.tsch.mode;
            let tsch_asn = tsch_mode.then(|| ctx.tsch.asn.value());
            let pan_id = ctx.pan_id;

            frame.len = incoming_security_procedure(
                &mut ctx.security,
                &mut frame.buffer[..len],
                mac_payload_offset,
                tsch_asn,
                pan_id,
            )?;

            (src_addr, tsch_mode)
        };

        parse_mac_payload(&frame.buffer[..frame.len])?;

        if tsch_mode {
            let Some(src_addr) = src_addr else {
                return Err(Error::NoData);
            };

            match self.handle_rx(&src_addr, timestamp) {
                RxVerdict::Continue(_time_correction_us) => {
                    // The correction travels back in the enhanced ACK's
                    // Time Correction IE; auto-ACK drivers derive it from
                    // the expected RX time they were configured with.
                }
                RxVerdict::Drop => {
                    debug!("frame does not belong to the active slot");
                    return Err(Error::NoData);
                }
            }
        }

        self.rx.send(frame);
        Ok(())
    }

    /// Turn TSCH mode on.
    ///
    /// # Errors
    ///
    /// `NotSupported` when the driver lacks timed TX or RX capabilities,
    /// `Busy` when TSCH mode is already on.
    pub async fn mode_on(&self) -> Result<()> {
        let caps = self.driver.borrow().hw_capabilities();
        if !caps.contains(TSCH_REQUIRED_HW_CAPS) {
            error!("TSCH requires a driver with timed RX and TX capabilities");
            return Err(Error::NotSupported);
        }

        let _scan = self.scan_lock.lock().await;

        {
            let mut ctx = self.ctx.lock().await;
            if ctx.tsch.mode {
                return Err(Error::Busy);
            }
            ctx.tsch.mode = true;
        }

        if caps.contains(HwCapabilities::AUTO_RX_TX_ACK) {
            // A driver that acknowledges itself must carry the Time
            // Correction IE in all its enhanced ACKs, see section
            // 6.5.4.3. Encoded: element ID 0x1e, length 2, zero
            // correction, ACK.
            let time_correction_ie = [0x02, 0x0f, 0x00, 0x00];
            let _ = self.driver.borrow_mut().configure(Config::EnhAckHeaderIe {
                ie: &time_correction_ie,
                short_addr: BROADCAST_ADDRESS,
            });
        }

        debug!("TSCH mode on");
        Ok(())
    }

    /// Turn TSCH mode off.
    ///
    /// Idempotent. The state machine unwinds after its current slot or
    /// association wait completes; pending transmissions are not
    /// cancelled.
    pub async fn mode_off(&self) -> Result<()> {
        let _scan = self.scan_lock.lock().await;
        self.ctx.lock().await.tsch.mode = false;
        debug!("TSCH mode off");
        Ok(())
    }

    /// Dispatch a network management request.
    pub async fn handle_mgmt_request(&self, request: MgmtRequest<'_>) -> Result<MgmtResponse> {
        match request {
            MgmtRequest::SetAck => self.ctx.lock().await.ack_requested = true,
            MgmtRequest::UnsetAck => self.ctx.lock().await.ack_requested = false,
            MgmtRequest::SetChannel(channel) => {
                if !self.driver.borrow().verify_channel(channel) {
                    return Err(Error::Invalid);
                }
                self.driver.borrow_mut().set_channel(channel)?;
                self.ctx.lock().await.channel = channel;
            }
            MgmtRequest::SetPanId(pan_id) => self.ctx.lock().await.set_pan_id(pan_id)?,
            MgmtRequest::SetShortAddr(short_addr) => {
                self.ctx.lock().await.set_short_addr(short_addr)?
            }
            MgmtRequest::SetTxPower(power) => self.ctx.lock().await.tx_power = power,
            MgmtRequest::SetDeviceRole(role) => self.ctx.lock().await.set_device_role(role)?,
            MgmtRequest::SetSecuritySettings { level, key } => {
                self.ctx.lock().await.set_security_settings(level, key)?
            }
            MgmtRequest::SetTschSlotframe {
                handle,
                size,
                advertise,
            } => {
                // The replaced slotframe is dropped here.
                let _ = self
                    .ctx
                    .lock()
                    .await
                    .tsch
                    .schedule
                    .set_slotframe(handle, size, advertise)?;
            }
            MgmtRequest::SetTschLink(link) => {
                let _ = self.ctx.lock().await.tsch.schedule.set_link(link)?;
            }
            MgmtRequest::SetHoppingSequence(channels) => {
                let sequence = HoppingSequence::new(channels)?;
                self.ctx.lock().await.hopping_sequence = Some(sequence);
            }
            MgmtRequest::SetTschMode(true) => self.mode_on().await?,
            MgmtRequest::SetTschMode(false) => self.mode_off().await?,
            MgmtRequest::GetDeviceRole => {
                return Ok(MgmtResponse::DeviceRole(self.ctx.lock().await.device_role))
            }
        }

        Ok(MgmtResponse::Done)
    }

    /// Run the TSCH state machine until TSCH mode is turned off.
    ///
    /// Must run as a high-priority cooperative task; everything
    /// slot-timed happens on this future.
    pub async fn run(&self) {
        debug!("TSCH state machine started");

        let mut slot_start: NetTime = 0;
        let mut synchronized = false;

        loop {
            let (mode, associated) = {
                let ctx = self.ctx.lock().await;
                (ctx.tsch.mode, ctx.is_associated())
            };

            if !mode {
                break;
            }

            if !associated {
                synchronized = false;
                debug!("waiting for association");
                self.delay.borrow_mut().delay_ms(1000).await;
                continue;
            }

            if !synchronized {
                // First active slot: power up the high-resolution
                // counter and capture the slot origin.
                if self.time.counter_wake_up().is_err() {
                    error!("cannot wake the network uptime counter");
                    return;
                }

                match self.time.get_time() {
                    Ok(now) => slot_start = now,
                    Err(_) => {
                        error!("cannot retrieve high resolution start time");
                        return;
                    }
                }

                synchronized = true;
            }

            let (next, timeslot_len) = {
                let mut ctx = self.ctx.lock().await;
                let neighbors = self.neighbors.borrow();
                let timeslot_len =
                    ctx.tsch.timeslot_template.timeslot_length.as_us() * NSEC_PER_USEC;
                let tsch = &mut ctx.tsch;
                let next = tsch.schedule.get_next_active_link(&mut tsch.asn, &neighbors);
                if next.is_none() {
                    // The ASN keeps counting elapsed timeslots even while
                    // the schedule is empty.
                    tsch.asn.advance(1);
                }
                (next, timeslot_len)
            };

            let offset = match &next {
                Some(next) => next.offset as i64 * timeslot_len,
                // An empty schedule still advances slot by slot.
                None => timeslot_len,
            };

            let programmed = self
                .time
                .timer_start(&self.slot_timer, slot_start + offset, 0, Rounding::Nearest)
                .unwrap_or(slot_start + offset);
            self.slot.borrow_mut().programmed_expiry = programmed;

            self.time.expired(&self.slot_timer).await;

            slot_start += offset;

            match next {
                Some(next) => self.operate_link(next, slot_start),
                None => error!("no link scheduled"),
            }
        }

        debug!("TSCH state machine stopped");
    }

    /// The network time the current slot's timer was programmed to after
    /// rounding.
    pub fn programmed_slot_expiry(&self) -> NetTime {
        self.slot.borrow().programmed_expiry
    }

    /// The channel count of the driver's current channel page.
    fn number_of_channels(&self) -> u16 {
        self.driver
            .borrow()
            .supported_channel_ranges()
            .iter()
            .map(|(from, to)| to - from + 1)
            .sum()
    }

    /// Operate the link(s) scheduled for the slot starting at
    /// `slot_start`.
    ///
    /// Runs in the timer expiry path, so locking must be immediate: on
    /// context contention the slot is abandoned.
    fn operate_link(&self, next: NextActiveLink, slot_start: NetTime) {
        let Some(mut ctx) = self.ctx.try_lock() else {
            debug!("slot abandoned: context contended");
            return;
        };

        trace!("timeslot started");

        self.slot.borrow_mut().current_link = None;

        // Channel hopping, see section 6.2.6.3.
        let Some(channel) = ctx
            .hopping_sequence
            .as_ref()
            .map(|hs| hs.channel_for(ctx.tsch.asn, next.primary.channel_offset))
        else {
            error!("no hopping sequence installed");
            return;
        };

        let previous_channel = ctx.channel;
        ctx.channel = channel;

        let template = ctx.tsch.timeslot_template;
        let mut current = next.primary;
        let mut tx_frame: Option<FrameBuffer> = None;

        loop {
            if ctx.device_role == DeviceRole::PanCoordinator && current.advertising {
                match create_enh_beacon(&ctx, self.number_of_channels(), true) {
                    Ok(frame) => tx_frame = Some(frame),
                    Err(_) => debug!("could not assemble enhanced beacon"),
                }
                break;
            }

            if current.tx {
                match self.neighbors.borrow_mut().dequeue(&current.node_addr) {
                    Ok(frame) => {
                        tx_frame = Some(frame);
                        break;
                    }
                    Err(_) => {
                        // Nothing queued: fall back to reception if the
                        // slot has a backup RX link.
                        if current.handle == next.primary.handle {
                            if let Some(backup) = next.backup {
                                current = backup;
                                continue;
                            }
                        }
                        break;
                    }
                }
            }

            break;
        }

        if let Some(mut frame) = tx_frame {
            let mut driver = self.driver.borrow_mut();

            // TX needs the channel set explicitly.
            if previous_channel != channel && driver.set_channel(channel).is_err() {
                error!("could not hop to the slot channel");
            }

            let tx_time = slot_start + template.tx_offset.as_us() * NSEC_PER_USEC;
            frame.timestamp = tx_time;

            {
                let mut slot = self.slot.borrow_mut();
                slot.current_link = Some(current);
                slot.programmed_tx_rx_time = Some(tx_time);
            }

            // TSCH CCA is a single assessment; a busy channel aborts the
            // slot. Re-scheduling the transmission (TSCH CSMA/CA) is not
            // implemented.
            if ctx.tsch.cca && driver.cca().is_err() {
                debug!("slot abandoned: channel busy");
                return;
            }

            if driver.send(&mut frame).is_err() {
                debug!("slot transmission failed");
            }
        } else if current.rx {
            // The expected RX time is macTsRxOffset + macTsRxWait / 2,
            // see section 6.5.4.3.
            let rx_start = slot_start + template.rx_offset.as_us() * NSEC_PER_USEC;
            let rx_duration = template.rx_wait.as_us() * NSEC_PER_USEC;
            let expected_rx_time = rx_start + rx_duration / 2;

            {
                let mut slot = self.slot.borrow_mut();
                slot.current_link = Some(current);
                slot.programmed_tx_rx_time = Some(expected_rx_time);
            }

            let mut driver = self.driver.borrow_mut();

            if driver
                .hw_capabilities()
                .contains(HwCapabilities::AUTO_RX_TX_ACK)
            {
                // An auto-ACKing driver computes the time correction
                // itself from the expected RX time.
                let _ = driver.configure(Config::ExpectedRxTime(expected_rx_time));
            }

            let _ = driver.configure(Config::RxSlot {
                start: rx_start,
                duration: rx_duration,
                channel,
            });
        } else {
            trace!("slot idle");
        }

        trace!("timeslot ended");
    }

    /// Correlate a received frame with the active RX link, see section
    /// 6.5.4.3.
    ///
    /// Returns the verdict and, for accepted frames, the time correction
    /// to be reported in the enhanced acknowledgment. Timekeeping links
    /// additionally discipline the local clock.
    pub fn handle_rx(&self, src_addr: &Address, pkt_timestamp: NetTime) -> RxVerdict {
        let (link, programmed) = {
            let slot = self.slot.borrow();

            let Some(link) = slot.current_link else {
                return RxVerdict::Drop;
            };

            let Some(programmed) = slot.programmed_tx_rx_time else {
                return RxVerdict::Drop;
            };

            if !link.rx {
                return RxVerdict::Drop;
            }

            (link, programmed)
        };

        if link.node_addr != *src_addr {
            return RxVerdict::Drop;
        }

        let time_correction_us =
            div_round_closest(programmed - pkt_timestamp, NSEC_PER_USEC) as i32;

        if link.timekeeping {
            self.handle_time_correction(time_correction_us);
        }

        RxVerdict::Continue(time_correction_us)
    }

    /// Apply a time correction measured against the current slot's
    /// programmed TX/RX time to the local clock.
    pub fn handle_time_correction(&self, time_correction_us: i32) {
        let programmed = {
            let slot = self.slot.borrow();

            let keeps_time = slot
                .current_link
                .as_ref()
                .is_some_and(|link| link.timekeeping);

            match slot.programmed_tx_rx_time {
                Some(programmed) if keeps_time => programmed,
                _ => return,
            }
        };

        let timepoint = self.time.get_timepoint_from_time(programmed, Rounding::Nearest);
        let actual = programmed + time_correction_us as i64 * NSEC_PER_USEC;

        self.time.syntonize(actual, timepoint);
    }
}
