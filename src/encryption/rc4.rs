// RC4 stream cipher used by the standard security handler.
#[derive(Clone)]
pub struct Rc4 {
    state: [u8; 256],
    i: u8,
    j: u8,
}

impl Rc4 {
    /// Keys are 1 to 256 bytes long; an empty key is treated as a single zero byte.
    pub fn new<Key: AsRef<[u8]>>(key: Key) -> Self {
        let key = key.as_ref();
        let key: &[u8] = if key.is_empty() { &[0] } else { key };

        let mut state = [0_u8; 256];
        for (i, v) in state.iter_mut().enumerate() {
            *v = i as u8;
        }

        let mut j = 0_u8;
        for i in 0..256 {
            j = j.wrapping_add(state[i]).wrapping_add(key[i % key.len()]);
            state.swap(i, j as usize);
        }

        Self { state, i: 0, j: 0 }
    }

    /// XOR the keystream into `data` in place; continues where the last call stopped.
    pub fn apply_keystream(&mut self, data: &mut [u8]) {
        for byte in data {
            self.i = self.i.wrapping_add(1);
            self.j = self.j.wrapping_add(self.state[self.i as usize]);
            self.state.swap(self.i as usize, self.j as usize);
            let index = self.state[self.i as usize].wrapping_add(self.state[self.j as usize]);
            *byte ^= self.state[index as usize];
        }
    }

    /// One-shot transform with a fresh keystream; RC4 is symmetric.
    pub fn process<Input: AsRef<[u8]>>(key: &[u8], input: Input) -> Vec<u8> {
        let mut output = input.as_ref().to_vec();
        Rc4::new(key).apply_keystream(&mut output);
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unhex(hex: &str) -> Vec<u8> {
        hex.as_bytes()
            .chunks_exact(2)
            .map(|pair| u8::from_str_radix(std::str::from_utf8(pair).unwrap(), 16).unwrap())
            .collect()
    }

    #[test]
    fn known_vectors() {
        let cases = [("Key", "Plaintext", "BBF316E8D940AF0AD3"), ("Wiki", "pedia", "1021BF0420")];
        for (key, plain, cipher) in cases {
            assert_eq!(Rc4::process(key.as_bytes(), plain), unhex(cipher));
            assert_eq!(Rc4::process(key.as_bytes(), unhex(cipher)), plain.as_bytes());
        }
    }

    #[test]
    fn streaming_matches_one_shot() {
        let mut cipher = Rc4::new(b"Secret");
        let mut data = b"Attack at dawn".to_vec();
        let (head, tail) = data.split_at_mut(5);
        cipher.apply_keystream(head);
        cipher.apply_keystream(tail);
        assert_eq!(data, Rc4::process(b"Secret", b"Attack at dawn"));
    }
}
