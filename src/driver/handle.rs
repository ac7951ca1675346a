use serde::{Deserialize, Serialize};
use std::fmt;

/// Hardware channel token understood by the native driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Handle(pub u16);

impl Handle {
    pub const NONEBUS: Handle = Handle(0x0);
    pub const ISABUS1: Handle = Handle(0x21);
    pub const ISABUS2: Handle = Handle(0x22);
    pub const ISABUS3: Handle = Handle(0x23);
    pub const ISABUS4: Handle = Handle(0x24);
    pub const ISABUS5: Handle = Handle(0x25);
    pub const ISABUS6: Handle = Handle(0x26);
    pub const ISABUS7: Handle = Handle(0x27);
    pub const ISABUS8: Handle = Handle(0x28);
    pub const DNGBUS1: Handle = Handle(0x31);
    pub const PCIBUS1: Handle = Handle(0x41);
    pub const PCIBUS2: Handle = Handle(0x42);
    pub const PCIBUS3: Handle = Handle(0x43);
    pub const PCIBUS4: Handle = Handle(0x44);
    pub const PCIBUS5: Handle = Handle(0x45);
    pub const PCIBUS6: Handle = Handle(0x46);
    pub const PCIBUS7: Handle = Handle(0x47);
    pub const PCIBUS8: Handle = Handle(0x48);
    pub const PCIBUS9: Handle = Handle(0x409);
    pub const PCIBUS10: Handle = Handle(0x40a);
    pub const PCIBUS11: Handle = Handle(0x40b);
    pub const PCIBUS12: Handle = Handle(0x40c);
    pub const PCIBUS13: Handle = Handle(0x40d);
    pub const PCIBUS14: Handle = Handle(0x40e);
    pub const PCIBUS15: Handle = Handle(0x40f);
    pub const PCIBUS16: Handle = Handle(0x410);
    pub const USBBUS1: Handle = Handle(0x51);
    pub const USBBUS2: Handle = Handle(0x52);
    pub const USBBUS3: Handle = Handle(0x53);
    pub const USBBUS4: Handle = Handle(0x54);
    pub const USBBUS5: Handle = Handle(0x55);
    pub const USBBUS6: Handle = Handle(0x56);
    pub const USBBUS7: Handle = Handle(0x57);
    pub const USBBUS8: Handle = Handle(0x58);
    pub const USBBUS9: Handle = Handle(0x509);
    pub const USBBUS10: Handle = Handle(0x50a);
    pub const USBBUS11: Handle = Handle(0x50b);
    pub const USBBUS12: Handle = Handle(0x50c);
    pub const USBBUS13: Handle = Handle(0x50d);
    pub const USBBUS14: Handle = Handle(0x50e);
    pub const USBBUS15: Handle = Handle(0x50f);
    pub const USBBUS16: Handle = Handle(0x510);
    pub const PCCBUS1: Handle = Handle(0x61);
    pub const PCCBUS2: Handle = Handle(0x62);
    pub const LANBUS1: Handle = Handle(0x801);
    pub const LANBUS2: Handle = Handle(0x802);
    pub const LANBUS3: Handle = Handle(0x803);
    pub const LANBUS4: Handle = Handle(0x804);
    pub const LANBUS5: Handle = Handle(0x805);
    pub const LANBUS6: Handle = Handle(0x806);
    pub const LANBUS7: Handle = Handle(0x807);
    pub const LANBUS8: Handle = Handle(0x808);
    pub const LANBUS9: Handle = Handle(0x809);
    pub const LANBUS10: Handle = Handle(0x80a);
    pub const LANBUS11: Handle = Handle(0x80b);
    pub const LANBUS12: Handle = Handle(0x80c);
    pub const LANBUS13: Handle = Handle(0x80d);
    pub const LANBUS14: Handle = Handle(0x80e);
    pub const LANBUS15: Handle = Handle(0x80f);
    pub const LANBUS16: Handle = Handle(0x810);
    /// Candidates probed by channel enumeration (the USB family).
    pub const USB_CHANNELS: [Handle; 16] = [
        Handle::USBBUS1,
        Handle::USBBUS2,
        Handle::USBBUS3,
        Handle::USBBUS4,
        Handle::USBBUS5,
        Handle::USBBUS6,
        Handle::USBBUS7,
        Handle::USBBUS8,
        Handle::USBBUS9,
        Handle::USBBUS10,
        Handle::USBBUS11,
        Handle::USBBUS12,
        Handle::USBBUS13,
        Handle::USBBUS14,
        Handle::USBBUS15,
        Handle::USBBUS16,
    ];

    /// Looks up a channel by its vendor name, e.g. `PCAN_USBBUS1`.
    pub fn from_name(name: &str) -> Option<Handle> {
        CHANNEL_NAMES
            .iter()
            .find(|(candidate, _)| *candidate == name)
            .map(|(_, handle)| *handle)
    }

    /// Vendor name of this channel, if it is a known one.
    pub fn name(&self) -> Option<&'static str> {
        CHANNEL_NAMES
            .iter()
            .find(|(_, handle)| handle == self)
            .map(|(name, _)| *name)
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "{:#x}", self.0),
        }
    }
}

const CHANNEL_NAMES: &[(&str, Handle)] = &[
    ("PCAN_NONEBUS", Handle::NONEBUS),
    ("PCAN_ISABUS1", Handle::ISABUS1),
    ("PCAN_ISABUS2", Handle::ISABUS2),
    ("PCAN_ISABUS3", Handle::ISABUS3),
    ("PCAN_ISABUS4", Handle::ISABUS4),
    ("PCAN_ISABUS5", Handle::ISABUS5),
    ("PCAN_ISABUS6", Handle::ISABUS6),
    ("PCAN_ISABUS7", Handle::ISABUS7),
    ("PCAN_ISABUS8", Handle::ISABUS8),
    ("PCAN_DNGBUS1", Handle::DNGBUS1),
    ("PCAN_PCIBUS1", Handle::PCIBUS1),
    ("PCAN_PCIBUS2", Handle::PCIBUS2),
    ("PCAN_PCIBUS3", Handle::PCIBUS3),
    ("PCAN_PCIBUS4", Handle::PCIBUS4),
    ("PCAN_PCIBUS5", Handle::PCIBUS5),
    ("PCAN_PCIBUS6", Handle::PCIBUS6),
    ("PCAN_PCIBUS7", Handle::PCIBUS7),
    ("PCAN_PCIBUS8", Handle::PCIBUS8),
    ("PCAN_PCIBUS9", Handle::PCIBUS9),
    ("PCAN_PCIBUS10", Handle::PCIBUS10),
    ("PCAN_PCIBUS11", Handle::PCIBUS11),
    ("PCAN_PCIBUS12", Handle::PCIBUS12),
    ("PCAN_PCIBUS13", Handle::PCIBUS13),
    ("PCAN_PCIBUS14", Handle::PCIBUS14),
    ("PCAN_PCIBUS15", Handle::PCIBUS15),
    ("PCAN_PCIBUS16", Handle::PCIBUS16),
    ("PCAN_USBBUS1", Handle::USBBUS1),
    ("PCAN_USBBUS2", Handle::USBBUS2),
    ("PCAN_USBBUS3", Handle::USBBUS3),
    ("PCAN_USBBUS4", Handle::USBBUS4),
    ("PCAN_USBBUS5", Handle::USBBUS5),
    ("PCAN_USBBUS6", Handle::USBBUS6),
    ("PCAN_USBBUS7", Handle::USBBUS7),
    ("PCAN_USBBUS8", Handle::USBBUS8),
    ("PCAN_USBBUS9", Handle::USBBUS9),
    ("PCAN_USBBUS10", Handle::USBBUS10),
    ("PCAN_USBBUS11", Handle::USBBUS11),
    ("PCAN_USBBUS12", Handle::USBBUS12),
    ("PCAN_USBBUS13", Handle::USBBUS13),
    ("PCAN_USBBUS14", Handle::USBBUS14),
    ("PCAN_USBBUS15", Handle::USBBUS15),
    ("PCAN_USBBUS16", Handle::USBBUS16),
    ("PCAN_PCCBUS1", Handle::PCCBUS1),
    ("PCAN_PCCBUS2", Handle::PCCBUS2),
    ("PCAN_LANBUS1", Handle::LANBUS1),
    ("PCAN_LANBUS2", Handle::LANBUS2),
    ("PCAN_LANBUS3", Handle::LANBUS3),
    ("PCAN_LANBUS4", Handle::LANBUS4),
    ("PCAN_LANBUS5", Handle::LANBUS5),
    ("PCAN_LANBUS6", Handle::LANBUS6),
    ("PCAN_LANBUS7", Handle::LANBUS7),
    ("PCAN_LANBUS8", Handle::LANBUS8),
    ("PCAN_LANBUS9", Handle::LANBUS9),
    ("PCAN_LANBUS10", Handle::LANBUS10),
    ("PCAN_LANBUS11", Handle::LANBUS11),
    ("PCAN_LANBUS12", Handle::LANBUS12),
    ("PCAN_LANBUS13", Handle::LANBUS13),
    ("PCAN_LANBUS14", Handle::LANBUS14),
    ("PCAN_LANBUS15", Handle::LANBUS15),
    ("PCAN_LANBUS16", Handle::LANBUS16),];
