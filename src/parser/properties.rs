use bitflags::bitflags;

bitflags! {
    /// Summary of the constructs a parsed pattern uses. Computed once while parsing and
    /// consulted by every later gating decision.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct RegexProperties: u32 {
        const ALTERNATIONS = 1;
        const CHAR_CLASSES = 1 << 1;
        const QUANTIFIERS = 1 << 2;
        const LOOPS = 1 << 3;
        const CAPTURE_GROUPS = 1 << 4;
        const BACK_REFERENCES = 1 << 5;
        const LARGE_COUNTED_REPETITIONS = 1 << 6;
        const LOOKAHEAD = 1 << 7;
        const NEGATIVE_LOOKAHEAD = 1 << 8;
        const LOOKBEHIND = 1 << 9;
        const NEGATIVE_LOOKBEHIND = 1 << 10;
        const COMPLEX_LOOKBEHIND = 1 << 11;
        const UNICODE_PROPERTIES = 1 << 12;
        const CAPTURE_GROUPS_IN_LOOKAROUND = 1 << 13;
    }
}

impl RegexProperties {
    pub fn has_lookaround(self) -> bool {
        self.intersects(
            Self::LOOKAHEAD | Self::NEGATIVE_LOOKAHEAD | Self::LOOKBEHIND | Self::NEGATIVE_LOOKBEHIND,
        )
    }

    pub fn has_capture_groups(self) -> bool {
        self.contains(Self::CAPTURE_GROUPS)
    }

    pub fn has_loops(self) -> bool {
        self.contains(Self::LOOPS)
    }
}
