//! Build identifier resolution
//!
//! Every captured artifact is tagged with a stable identifier tying it to
//! the exact binary that produced it. Two strategies exist, chosen at build
//! time:
//!
//! - **GNU build id**: the toolchain emits a note section containing a SHA1
//!   digest; the linker script exports its start address and the firmware
//!   hands the raw section bytes to [`BuildId::gnu_note`].
//! - **Derived build id**: a statically-linked placeholder buffer whose
//!   contents are rewritten after linking by an external tool that hashes
//!   the final binary. The runtime side only ever reads the buffer; the
//!   patch step is a build-system concern.

use tracing::info;

/// Size of the identifier digest in bytes (a SHA1-style digest)
pub const BUILD_ID_LEN: usize = 20;

/// Placeholder contents for the derived-id strategy
///
/// The first byte is non-zero so the buffer is never placed in
/// zero-initialized storage, letting the post-link patch tool locate and
/// rewrite it reliably.
pub const DERIVED_BUILD_ID_PLACEHOLDER: [u8; BUILD_ID_LEN] = [
    0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00,
];

// Offsets within an ELF note section: namesz, descsz and type words precede
// the name bytes ("GNU\0" for a GNU build id), which precede the digest.
const NOTE_HEADER_LEN: usize = 12;

/// How the build identifier is resolved for this image
///
/// Statically allocated at link/compile time and read-only at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildId {
    /// No build id configured; reads yield nothing
    None,

    /// Identifier patched into a placeholder buffer post-link
    Derived(&'static [u8; BUILD_ID_LEN]),

    /// Raw bytes of a linker-provided GNU build id note section
    GnuNote(&'static [u8]),
}

impl BuildId {
    /// Wrap a linker-provided note section
    pub fn gnu_note(section: &'static [u8]) -> Self {
        BuildId::GnuNote(section)
    }

    /// Wrap the post-link patched placeholder buffer
    pub fn derived(storage: &'static [u8; BUILD_ID_LEN]) -> Self {
        BuildId::Derived(storage)
    }

    /// Resolve the start of the digest bytes, if any
    fn digest(&self) -> Option<&[u8]> {
        match self {
            BuildId::None => None,
            BuildId::Derived(storage) => Some(&storage[..]),
            BuildId::GnuNote(section) => {
                // namesz is the first word of the note header; the digest
                // follows the name bytes ("GNU\0").
                let namesz_bytes = section.get(..4)?;
                let namesz = u32::from_le_bytes([
                    namesz_bytes[0],
                    namesz_bytes[1],
                    namesz_bytes[2],
                    namesz_bytes[3],
                ]) as usize;

                let start = NOTE_HEADER_LEN.checked_add(namesz)?;
                section.get(start..start + BUILD_ID_LEN)
            }
        }
    }

    /// Copy the identifier into a caller buffer
    ///
    /// Returns `None` when no build id is configured or the note section is
    /// malformed.
    pub fn read(&self) -> Option<[u8; BUILD_ID_LEN]> {
        let digest = self.digest()?;
        let mut out = [0u8; BUILD_ID_LEN];
        out.copy_from_slice(digest);
        Some(out)
    }

    /// The identifier as lowercase hex, for display
    pub fn to_hex(&self) -> Option<String> {
        self.read().map(hex::encode)
    }

    /// Log the build id, prefixed by the resolution strategy
    ///
    /// A diagnostic aid for boot banners and device CLIs; not used for
    /// control flow.
    pub fn dump(&self) {
        match self.to_hex() {
            None => info!("No Build ID available"),
            Some(id) => {
                let strategy = match self {
                    BuildId::GnuNote(_) => "GNU",
                    _ => "Blackbox",
                };
                info!("{} Build ID: {}", strategy, id);
            }
        }
    }
}
