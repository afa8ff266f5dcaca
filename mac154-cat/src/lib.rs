//! Dissect IEEE 802.15.4 frames into colored, human-readable text.

use colored::*;
use mac154_frame::*;

struct Writer<'b> {
    buffer: &'b mut String,
    indent: usize,
}

impl<'b> Writer<'b> {
    fn new(buffer: &'b mut String) -> Self {
        Self { buffer, indent: 0 }
    }

    fn increase_indent(&mut self) {
        self.indent += 2;
    }

    fn decrease_indent(&mut self) {
        self.indent -= 2;
    }

    fn writeln(&mut self, s: String) {
        self.buffer.push_str(&" ".repeat(self.indent));
        self.buffer.push_str(&s);
        self.buffer.push('\n');
    }

    fn field(&mut self, name: &str, value: impl std::fmt::Display) {
        self.writeln(format!("{}: {}", name.bold(), value));
    }

    fn section(&mut self, name: &str) {
        self.writeln(name.underline().bold().to_string());
    }
}

/// Renders a frame into an annotated dissection.
pub struct FrameParser;

impl FrameParser {
    /// Parse a hex-encoded frame.
    pub fn parse_hex(input: &str) -> Result<String> {
        let data = hex::decode(input).map_err(|_| Error)?;
        Self::parse(&data)
    }

    /// Parse a frame from raw octets.
    pub fn parse(input: &[u8]) -> Result<String> {
        let frame = Frame::new(input)?;
        let fc = frame.frame_control();

        let mut buffer = String::new();
        let mut w = Writer::new(&mut buffer);

        let enhanced = fc.frame_version() == FrameVersion::Ieee802154_2020
            && matches!(fc.frame_type(), FrameType::Beacon | FrameType::Ack);

        w.section("Frame Control");
        w.increase_indent();
        w.field(
            "frame type",
            format!(
                "{}{:?}",
                if enhanced { "Enhanced " } else { "" },
                fc.frame_type()
            )
            .bright_blue(),
        );
        w.field("security", fc.security_enabled() as usize);
        w.field("frame pending", fc.frame_pending() as usize);
        w.field("ack request", fc.ack_request() as usize);
        w.field("pan id compression", fc.pan_id_compression() as usize);
        w.field(
            "sequence number suppression",
            fc.sequence_number_suppression() as usize,
        );
        w.field(
            "information elements present",
            fc.information_elements_present() as usize,
        );
        w.field("dst addressing mode", format!("{:?}", fc.dst_addressing_mode()));
        w.field("src addressing mode", format!("{:?}", fc.src_addressing_mode()));
        w.field("frame version", format!("{:?}", fc.frame_version()));
        w.decrease_indent();

        if let Some(seq) = frame.sequence_number() {
            w.field("Sequence number", seq);
        }

        if let Some(af) = frame.addressing() {
            w.section("Addressing");
            w.increase_indent();
            if let Some(pan_id) = af.dst_pan_id(&fc) {
                w.field("dst pan id", format!("{:04x}", pan_id));
            }
            if let Some(addr) = af.dst_address(&fc) {
                w.field("dst address", addr.to_string().bright_green());
            }
            if let Some(pan_id) = af.src_pan_id(&fc) {
                w.field("src pan id", format!("{:04x}", pan_id));
            }
            if let Some(addr) = af.src_address(&fc) {
                w.field("src address", addr.to_string().bright_green());
            }
            w.decrease_indent();
        }

        if let Some(aux) = frame.auxiliary_security_header() {
            w.section("Auxiliary Security Header");
            w.increase_indent();
            w.field("level", format!("{:?}", aux.security_level()));
            w.field("key id mode", format!("{:?}", aux.key_identifier_mode()));
            w.field("frame counter", aux.frame_counter());
            w.decrease_indent();
        }

        if let Some(ie) = frame.information_elements() {
            w.section("Information Elements");
            w.increase_indent();

            for header_ie in ie.header_information_elements() {
                Self::dissect_header_ie(&mut w, &header_ie);
            }

            for payload_ie in ie.payload_information_elements() {
                Self::dissect_payload_ie(&mut w, &payload_ie);
            }

            w.decrease_indent();
        }

        if let Some(payload) = frame.payload() {
            w.section("Payload");
            w.increase_indent();
            w.writeln(hex::encode(payload).bright_magenta().to_string());
            w.decrease_indent();
        }

        Ok(buffer)
    }

    fn dissect_header_ie(w: &mut Writer<'_>, ie: &HeaderInformationElement<&[u8]>) {
        w.writeln(format!("{:?}", ie.element_id()).bright_blue().to_string());
        w.increase_indent();

        match ie.element_id() {
            HeaderElementId::TimeCorrection => {
                if let Ok(tc) = TimeCorrection::new(ie.content()) {
                    w.field("time correction", tc.time_correction());
                    w.field("nack", tc.nack() as usize);
                } else {
                    w.field("content", hex::encode(ie.content()));
                }
            }
            HeaderElementId::Csl => {
                if let Ok(csl) = Csl::new(ie.content()) {
                    w.field("phase", csl.csl_phase());
                    w.field("period", csl.csl_period());
                    if let Some(rendezvous_time) = csl.rendezvous_time() {
                        w.field("rendezvous time", rendezvous_time);
                    }
                }
            }
            HeaderElementId::HeaderTermination1 | HeaderElementId::HeaderTermination2 => {}
            _ => w.field("content", hex::encode(ie.content())),
        }

        w.decrease_indent();
    }

    fn dissect_payload_ie(w: &mut Writer<'_>, ie: &PayloadInformationElement<&[u8]>) {
        w.writeln(format!("{:?}", ie.group_id()).bright_blue().to_string());
        w.increase_indent();

        if ie.group_id() == PayloadGroupId::Mlme {
            for nested in ie.nested_information_elements() {
                Self::dissect_nested_ie(w, &nested);
            }
        } else {
            w.field("content", hex::encode(ie.content()));
        }

        w.decrease_indent();
    }

    fn dissect_nested_ie(w: &mut Writer<'_>, ie: &NestedInformationElement<&[u8]>) {
        w.writeln(format!("{:?}", ie.sub_id()).bright_blue().to_string());
        w.increase_indent();

        match ie.sub_id() {
            NestedSubId::Short(NestedSubIdShort::TschSynchronization) => {
                if let Ok(sync) = TschSynchronization::new(ie.content()) {
                    w.field("ASN", sync.absolute_slot_number());
                    w.field("join metric", sync.join_metric());
                }
            }
            NestedSubId::Short(NestedSubIdShort::TschTimeslot) => {
                if let Ok(timeslot) = TschTimeslot::new(ie.content()) {
                    w.field("id", timeslot.id());
                    if let Some(timings) = timeslot.timings() {
                        w.field("cca offset", timings.cca_offset);
                        w.field("cca", timings.cca);
                        w.field("tx offset", timings.tx_offset);
                        w.field("rx offset", timings.rx_offset);
                        w.field("rx ack delay", timings.rx_ack_delay);
                        w.field("tx ack delay", timings.tx_ack_delay);
                        w.field("rx wait", timings.rx_wait);
                        w.field("ack wait", timings.ack_wait);
                        w.field("rx/tx", timings.rx_tx);
                        w.field("max ack", timings.max_ack);
                        w.field("max tx", timings.max_tx);
                        w.field("timeslot length", timings.timeslot_length);
                    }
                }
            }
            NestedSubId::Short(NestedSubIdShort::TschSlotframeAndLink) => {
                if let Ok(slotframes) = TschSlotframeAndLink::new(ie.content()) {
                    w.field("slotframes", slotframes.number_of_slotframes());
                    for descriptor in slotframes.slotframe_descriptors() {
                        w.field("handle", descriptor.handle());
                        w.increase_indent();
                        w.field("size", descriptor.size());
                        for link in descriptor.link_informations() {
                            w.writeln(format!(
                                "timeslot {}, channel offset {}, {:?}",
                                link.timeslot(),
                                link.channel_offset(),
                                link.link_options()
                            ));
                        }
                        w.decrease_indent();
                    }
                }
            }
            NestedSubId::Long(NestedSubIdLong::ChannelHopping) => {
                if let Ok(hopping) = ChannelHopping::new(ie.content()) {
                    w.field("sequence id", hopping.hopping_sequence_id());
                    if !hopping.is_shortened() {
                        w.field("channel page", hopping.channel_page());
                        w.field("number of channels", hopping.number_of_channels());
                        let channels: Vec<String> = hopping
                            .hopping_sequence()
                            .map(|channel| channel.to_string())
                            .collect();
                        w.field("sequence", channels.join(", "));
                        w.field("current hop", hopping.current_hop());
                    }
                }
            }
            _ => w.field("content", hex::encode(ie.content())),
        }

        w.decrease_indent();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dissect_enhanced_beacon() {
        colored::control::set_override(false);

        let output = FrameParser::parse_hex(
            "40ebcdabffff0100010001000100003f1188061a0e0000000000011c0001c800011b00",
        )
        .unwrap();

        assert!(output.contains("Enhanced Beacon"));
        assert!(output.contains("ASN: 14"));
        assert!(output.contains("TschSynchronization"));
    }

    #[test]
    fn dissect_imm_ack() {
        colored::control::set_override(false);

        let output = FrameParser::parse_hex("02002a").unwrap();
        assert!(output.contains("Ack"));
        assert!(output.contains("Sequence number: 42"));
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(FrameParser::parse_hex("zz").is_err());
        assert!(FrameParser::parse_hex("ff").is_err());
    }
}
