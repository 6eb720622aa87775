use super::*;
use tracing::debug;

/// Reads several streams of the same format, one after the other, and folds
/// them into a single [`BioAssay`].
///
/// Each table is passed to a transform hook together with the index of its
/// stream before being merged, typically to give a channel-specific name to
/// a column every stream shares. Fields requested on this reader apply to
/// every stream.
///
/// Streams are consumed by a read, successful or not: reading again fails
/// with [`IoError::NoStream`] until new streams are added.
pub struct MultiStreamReader<R, F> {
    reader: BioAssayReader<R, F>,
    streams: Vec<R>,
    consumed: bool,
}

impl<R: BufRead, F: Format> MultiStreamReader<R, F> {
    pub fn new(format: F) -> Self {
        MultiStreamReader {
            reader: BioAssayReader::without_input(format),
            streams: Vec::new(),
            consumed: false,
        }
    }

    pub fn add_stream(&mut self, stream: R) {
        self.streams.push(stream);
    }

    pub fn stream_count(&self) -> usize {
        self.streams.len()
    }

    pub fn add_field_to_read(&mut self, field: &str) {
        self.reader.add_field_to_read(field);
    }

    pub fn add_all_fields_to_read(&mut self) {
        self.reader.add_all_fields_to_read();
    }

    pub fn format(&self) -> &F {
        self.reader.format()
    }

    /// Read every stream, using [`Format::transform`] as the hook.
    ///
    /// Returns `Ok(None)` if no stream was ever added.
    pub fn read(&mut self) -> Result<Option<BioAssay>> {
        self.fold(|format, assay, index| format.transform(assay, index))
    }

    /// Read every stream, using `hook` instead of the format's transform
    pub fn read_with<H>(&mut self, mut hook: H) -> Result<Option<BioAssay>>
    where
        H: FnMut(&mut BioAssay, usize) -> Result<()>,
    {
        self.fold(|_, assay, index| hook(assay, index))
    }

    fn fold<H>(&mut self, mut hook: H) -> Result<Option<BioAssay>>
    where
        H: FnMut(&F, &mut BioAssay, usize) -> Result<()>,
    {
        if self.streams.is_empty() && self.consumed {
            return Err(IoError::NoStream);
        }
        let streams = std::mem::take(&mut self.streams);
        self.consumed = !streams.is_empty();
        let mut result: Option<BioAssay> = None;

        for (index, stream) in streams.into_iter().enumerate() {
            self.reader.clear();
            self.reader.set_input(stream);
            let mut assay = self.reader.read()?;
            debug!("stream {}: {} rows", index, assay.len());
            hook(self.reader.format(), &mut assay, index)?;
            result = Some(BioAssay::merge_optional(result, assay)?);
        }
        Ok(result)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    struct Channel {
        meta: FieldMetadata,
    }

    impl Channel {
        fn new() -> Channel {
            Channel {
                meta: FieldMetadata::tab_delimited()
                    .with_order(&["ID", "Signal"])
                    .with_ints(&["Signal"])
                    .with_converter(FieldNameConverter::new().with("id", "ID")),
            }
        }
    }

    impl Format for Channel {
        fn metadata(&self) -> &FieldMetadata {
            &self.meta
        }

        fn read_all_fields(&self) -> bool {
            true
        }

        fn transform(&self, assay: &mut BioAssay, index: usize) -> Result<()> {
            assay.rename("Signal", if index == 0 { "green" } else { "red" })?;
            Ok(())
        }
    }

    #[test]
    fn merge_two_channels() {
        let mut reader = MultiStreamReader::new(Channel::new());
        reader.add_stream(&b"\"g1\"\t100\n"[..]);
        reader.add_stream(&b"\"g1\"\t250\n"[..]);
        assert_eq!(reader.stream_count(), 2);

        let ba = reader.read().unwrap().unwrap();
        assert_eq!(ba.greens(), Some(&[100][..]));
        assert_eq!(ba.reds(), Some(&[250][..]));
        assert_eq!(ba.ids().unwrap(), &["g1".to_string()]);
        assert_eq!(reader.stream_count(), 0);
    }

    #[test]
    fn custom_hook() {
        let mut reader = MultiStreamReader::new(Channel::new());
        reader.add_stream(&b"a\t1\nb\t2\n"[..]);
        reader.add_stream(&b"a\t3\nb\t4\n"[..]);
        reader.add_stream(&b"a\t5\nb\t6\n"[..]);

        let ba = reader
            .read_with(|assay, index| {
                assay.rename("Signal", &format!("signal{}", index))?;
                Ok(())
            })
            .unwrap()
            .unwrap();
        assert_eq!(ba.ints("signal0"), Some(&[1, 2][..]));
        assert_eq!(ba.ints("signal1"), Some(&[3, 4][..]));
        assert_eq!(ba.ints("signal2"), Some(&[5, 6][..]));
    }

    #[test]
    fn no_streams() {
        let mut reader: MultiStreamReader<&[u8], _> = MultiStreamReader::new(Channel::new());
        assert!(reader.read().unwrap().is_none());
    }

    #[test]
    fn mismatched_streams_fail() {
        let mut reader = MultiStreamReader::new(Channel::new());
        reader.add_stream(&b"a\t1\n"[..]);
        reader.add_stream(&b"b\t1\n"[..]);
        reader.add_stream(&b"a\t1\n"[..]);
        assert!(matches!(reader.read(), Err(IoError::Table(BioAssayError::MergeMismatch(_)))));
        assert_eq!(reader.stream_count(), 0);
        assert!(matches!(reader.read(), Err(IoError::NoStream)));
    }

    #[test]
    fn read_twice() {
        let mut reader = MultiStreamReader::new(Channel::new());
        reader.add_stream(&b"a\t1\n"[..]);
        assert_eq!(reader.read().unwrap().unwrap().len(), 1);
        assert!(matches!(reader.read(), Err(IoError::NoStream)));

        reader.add_stream(&b"a\t2\nb\t3\n"[..]);
        assert_eq!(reader.read().unwrap().unwrap().len(), 2);
    }
}
