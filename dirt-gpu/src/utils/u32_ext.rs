pub trait U32Ext
where
    Self: Sized,
{
    fn from_bytes(bytes: [u32; 4]) -> Self;
    fn to_bytes(self) -> [u32; 4];
    fn from_halves(halves: [u32; 2]) -> Self;
    fn to_halves(self) -> [u32; 2];
}

impl U32Ext for u32 {
    fn from_bytes([a, b, c, d]: [u32; 4]) -> Self {
        (a & 0xff) | ((b & 0xff) << 8) | ((c & 0xff) << 16) | ((d & 0xff) << 24)
    }

    fn to_bytes(self) -> [u32; 4] {
        [
            self & 0xff,
            (self >> 8) & 0xff,
            (self >> 16) & 0xff,
            (self >> 24) & 0xff,
        ]
    }

    fn from_halves([lo, hi]: [u32; 2]) -> Self {
        (lo & 0xffff) | ((hi & 0xffff) << 16)
    }

    fn to_halves(self) -> [u32; 2] {
        [self & 0xffff, self >> 16]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes() {
        assert_eq!(0xcafebabe, u32::from_bytes(u32::to_bytes(0xcafebabe)));
        assert_eq!([0xbe, 0xba, 0xfe, 0xca], 0xcafebabe_u32.to_bytes());
    }

    #[test]
    fn halves() {
        assert_eq!([0xbabe, 0xcafe], 0xcafebabe_u32.to_halves());
        assert_eq!(0xcafebabe, u32::from_halves([0xbabe, 0xcafe]));
    }
}
