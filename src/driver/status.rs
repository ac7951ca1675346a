use bitflags::bitflags;
use std::fmt;

bitflags! {
    /// Native status bitmask returned by every driver call.
    ///
    /// Bit positions match the vendor API exactly. Several conditions may be
    /// reported at once; see [`Status::class`] for how they are interpreted.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Status: u32 {
        const XMTFULL = 0x00001;      // Transmit buffer in CAN controller is full
        const OVERRUN = 0x00002;      // CAN controller was read too late
        const BUSLIGHT = 0x00004;     // Error counter reached the 'light' limit
        const BUSHEAVY = 0x00008;     // Error counter reached the 'heavy' limit
        const BUSWARNING = Self::BUSHEAVY.bits();
        const BUSOFF = 0x00010;       // Controller is in bus-off state
        const QRCVEMPTY = 0x00020;    // Receive queue is empty
        const QOVERRUN = 0x00040;     // Receive queue was read too late
        const QXMTFULL = 0x00080;     // Transmit queue is full
        const REGTEST = 0x00100;      // Register test failed (no hardware found)
        const NODRIVER = 0x00200;     // Driver not loaded
        const HWINUSE = 0x00400;      // Hardware already in use by a net
        const NETINUSE = 0x00800;     // A client is already connected to the net
        const ILLHW = 0x01400;        // Hardware handle is invalid
        const ILLNET = 0x01800;       // Net handle is invalid
        const ILLCLIENT = 0x01C00;    // Client handle is invalid
        const ILLHANDLE = Self::ILLHW.bits() | Self::ILLNET.bits() | Self::ILLCLIENT.bits();
        const RESOURCE = 0x02000;     // Resource (FIFO, client, timeout) cannot be created
        const ILLPARAMTYPE = 0x04000; // Invalid parameter
        const ILLPARAMVAL = 0x08000;  // Invalid parameter value
        const UNKNOWN = 0x10000;      // Unknown error
        const ILLDATA = 0x20000;      // Invalid data, function, or action
        const BUSPASSIVE = 0x40000;   // Controller is error passive
        const CAUTION = 0x2000000;    // Operation succeeded with irregularities
        const INITIALIZE = 0x4000000; // Channel is not initialized
        const ILLOPERATION = 0x8000000; // Invalid operation

        const ANYBUSERR = Self::BUSWARNING.bits()
            | Self::BUSLIGHT.bits()
            | Self::BUSHEAVY.bits()
            | Self::BUSOFF.bits()
            | Self::BUSPASSIVE.bits();
    }
}

/// How a native status affects the operation that returned it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    /// No condition at all.
    Ok,
    /// Only advisory bits are set; the call succeeded.
    Advisory,
    /// The receive queue was empty (possibly alongside advisory bits).
    Empty,
    /// A typed, retryable failure.
    Recoverable,
    /// Propagated immediately, no retry.
    Fatal,
}

impl Status {
    pub const OK: Status = Status::empty();

    /// Error-counter thresholds and "succeeded with irregularities".
    pub const ADVISORY: Status = Status::BUSLIGHT
        .union(Status::BUSHEAVY)
        .union(Status::BUSPASSIVE)
        .union(Status::CAUTION);

    pub const RECOVERABLE: Status = Status::ILLPARAMTYPE
        .union(Status::ILLPARAMVAL)
        .union(Status::QXMTFULL)
        .union(Status::XMTFULL)
        .union(Status::QOVERRUN)
        .union(Status::OVERRUN);

    /// Wraps a raw status word, keeping bits this crate has no name for.
    pub fn from_raw(raw: u32) -> Self {
        Status::from_bits_retain(raw)
    }

    pub fn is_ok(&self) -> bool {
        self.is_empty()
    }

    /// Advisory bits present in this status.
    pub fn advisory(&self) -> Status {
        self.intersection(Status::ADVISORY)
    }

    /// Classifies the status. Fatal bits win over recoverable ones, which win
    /// over an empty receive queue.
    pub fn class(&self) -> StatusClass {
        if self.is_empty() {
            return StatusClass::Ok;
        }

        let rest = self.difference(Status::ADVISORY);
        if rest.is_empty() {
            return StatusClass::Advisory;
        }

        let rest_no_empty = rest.difference(Status::QRCVEMPTY);
        if rest_no_empty.is_empty() {
            return StatusClass::Empty;
        }

        if rest_no_empty.difference(Status::RECOVERABLE).is_empty() {
            StatusClass::Recoverable
        } else {
            StatusClass::Fatal
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#07x}", self.bits())
    }
}
