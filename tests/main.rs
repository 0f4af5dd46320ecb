extern crate core;

#[cfg(test)]
mod tests {
    use apng_player::{
        AnimatedSprite, AnimationSequence, Apng, ApngError, Callbacks, ChunkReader, ChunkType, DecodeOptions,
        ManualClock, PixelBuffer, PlaybackEngine, PlaybackOptions,
    };
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;
    use std::sync::Arc;
    use writer::{Writer, WriterFilter, WriterHeader, WriterImage, WriterImageFrame, PNG_SIGNATURE};

    const RED: [u8; 4] = [255, 0, 0, 255];
    const GREEN: [u8; 4] = [0, 255, 0, 255];
    const BLUE: [u8; 4] = [0, 0, 255, 255];
    const CLEAR: [u8; 4] = [0, 0, 0, 0];

    struct TestCase {
        name: &'static str,
        image: WriterImage,
        options: DecodeOptions,
        validation: Option<Box<dyn Fn(&AnimationSequence)>>,
    }

    struct ErrorCase {
        name: &'static str,
        data: Vec<u8>,
        options: DecodeOptions,
        expected: fn(&ApngError) -> bool,
    }

    fn gradient(width: u32, height: u32, channels: u32) -> Vec<u8> {
        let mut pixels = Vec::new();
        for y in 0..height {
            for x in 0..width {
                for c in 0..channels {
                    pixels.push(((x * 37 + y * 91 + c * 53) % 256) as u8);
                }
            }
        }
        pixels
    }

    fn pixel(sequence: &AnimationSequence, frame: usize, x: u32, y: u32) -> [u8; 4] {
        let start = ((y * sequence.width() + x) * 4) as usize;
        let pixels = sequence.frame(frame).unwrap().pixels();
        [pixels[start], pixels[start + 1], pixels[start + 2], pixels[start + 3]]
    }

    fn three_frames() -> WriterImage {
        let frames = vec![
            WriterImageFrame::solid(2, 2, RED).with_delay(1, 10),
            WriterImageFrame::solid(2, 2, GREEN).with_delay(15, 100),
            WriterImageFrame::solid(2, 2, BLUE).with_delay(1, 4),
        ];
        WriterImage::new(WriterHeader::rgba8(2, 2), frames)
    }

    fn header(width: u32, height: u32, bit_depth: u8, color_type: u8) -> WriterHeader {
        WriterHeader {
            width,
            height,
            bit_depth,
            color_type,
            interlaced: false,
        }
    }

    fn check_invariants(sequence: &AnimationSequence) {
        let frames = sequence.frames();
        let expected_len = (sequence.width() * sequence.height() * 4) as usize;

        assert!(!frames.is_empty());
        assert_eq!(frames[0].start_ms(), 0.0);

        for pair in frames.windows(2) {
            assert_eq!(pair[0].end_ms(), pair[1].start_ms());
        }

        for frame in frames {
            assert!(frame.end_ms() > frame.start_ms());
            assert_eq!(frame.pixels().len(), expected_len);
        }

        assert_eq!(frames[frames.len() - 1].end_ms(), sequence.total_duration());
    }

    fn test_decode(test_case: TestCase) -> Result<(), Box<dyn std::error::Error>> {
        let data = Writer::encode_apng(&test_case.image)?;

        match apng_player::decode(&data, &test_case.options) {
            Ok(sequence) => {
                check_invariants(&sequence);

                if let Some(validate) = test_case.validation {
                    validate(&sequence);
                }

                Ok(())
            }
            Err(e) => {
                println!("Error decoding image: {:?}", e);
                panic!("Failed to decode {}", test_case.name);
            }
        }
    }

    #[test]
    fn test_all_fixtures() -> Result<(), Box<dyn std::error::Error>> {
        let mut hidden_default = WriterImage::new(
            WriterHeader::rgba8(2, 2),
            vec![WriterImageFrame::solid(2, 2, GREEN), WriterImageFrame::solid(2, 2, BLUE)],
        );
        hidden_default.static_image = Some(RED.repeat(4));

        let mut split_chunks = three_frames();
        split_chunks.max_chunk_len = Some(5);

        let mut looping = three_frames();
        looping.num_plays = 3;

        let mut indexed = WriterImage::still(header(4, 1, 2, 3), vec![0b00_01_10_11]);
        indexed.palette = Some(vec![[10, 20, 30], [40, 50, 60], [70, 80, 90], [100, 110, 120]]);
        indexed.transparency = Some(vec![0, 128]);

        let mut color_key = WriterImage::still(header(2, 1, 8, 2), vec![1, 2, 3, 4, 5, 6]);
        color_key.transparency = Some(vec![0, 1, 0, 2, 0, 3]);

        let mut mismatched_count = three_frames();
        mismatched_count.declared_frames = Some(5);

        let test_cases = vec![
            TestCase {
                name: "Three frame timing",
                image: three_frames(),
                options: DecodeOptions::default(),
                validation: Some(Box::new(|sequence: &AnimationSequence| {
                    let ends: Vec<f64> = sequence.frames().iter().map(|f| f.end_ms()).collect();
                    assert_eq!(ends, vec![100.0, 250.0, 500.0]);
                    assert_eq!(sequence.total_duration(), 500.0);
                    assert_eq!(sequence.loop_count(), 0);
                    assert_eq!(pixel(sequence, 0, 1, 1), RED);
                    assert_eq!(pixel(sequence, 2, 0, 0), BLUE);
                })),
            },
            TestCase {
                name: "Zero denominator delay",
                image: WriterImage::new(
                    WriterHeader::rgba8(1, 1),
                    vec![
                        WriterImageFrame::solid(1, 1, RED).with_delay(7, 0),
                        WriterImageFrame::solid(1, 1, BLUE).with_delay(1, 10),
                    ],
                ),
                options: DecodeOptions::default(),
                validation: Some(Box::new(|sequence: &AnimationSequence| {
                    assert_eq!(sequence.frames()[0].duration_ms(), 100.0);
                    assert_eq!(sequence.total_duration(), 200.0);
                })),
            },
            TestCase {
                name: "Zero delay uses fallback",
                image: WriterImage::new(
                    WriterHeader::rgba8(1, 1),
                    vec![
                        WriterImageFrame::solid(1, 1, RED).with_delay(0, 10),
                        WriterImageFrame::solid(1, 1, BLUE).with_delay(1, 30),
                    ],
                ),
                options: DecodeOptions::default().with_fallback_fps(20.0),
                validation: Some(Box::new(|sequence: &AnimationSequence| {
                    assert_eq!(sequence.frames()[0].duration_ms(), 50.0);
                    assert!((sequence.frames()[1].duration_ms() - 1000.0 / 30.0).abs() < 1e-9);
                })),
            },
            TestCase {
                name: "Static image",
                image: WriterImage::still(WriterHeader::rgba8(3, 2), gradient(3, 2, 4)),
                options: DecodeOptions::default().with_fallback_fps(10.0),
                validation: Some(Box::new(|sequence: &AnimationSequence| {
                    assert_eq!(sequence.frame_count(), 1);
                    assert_eq!(sequence.total_duration(), 100.0);
                    assert!(!sequence.is_animated());
                    assert_eq!(sequence.frame(0).unwrap().pixels(), &gradient(3, 2, 4)[..]);
                })),
            },
            TestCase {
                name: "Hidden default image",
                image: hidden_default,
                options: DecodeOptions::default(),
                validation: Some(Box::new(|sequence: &AnimationSequence| {
                    assert_eq!(sequence.frame_count(), 2);
                    assert_eq!(pixel(sequence, 0, 0, 0), GREEN);
                    assert_eq!(pixel(sequence, 1, 1, 1), BLUE);
                })),
            },
            TestCase {
                name: "Data split across chunks",
                image: split_chunks,
                options: DecodeOptions::default(),
                validation: Some(Box::new(|sequence: &AnimationSequence| {
                    assert_eq!(sequence.frame_count(), 3);
                    assert_eq!(pixel(sequence, 1, 0, 1), GREEN);
                })),
            },
            TestCase {
                name: "Stream play count",
                image: looping,
                options: DecodeOptions::default(),
                validation: Some(Box::new(|sequence: &AnimationSequence| {
                    assert_eq!(sequence.loop_count(), 3);
                })),
            },
            TestCase {
                name: "Declared frame count mismatch",
                image: mismatched_count,
                options: DecodeOptions::default(),
                validation: Some(Box::new(|sequence: &AnimationSequence| {
                    assert_eq!(sequence.frame_count(), 3);
                })),
            },
            TestCase {
                name: "Indexed 2-bit with tRNS",
                image: indexed,
                options: DecodeOptions::default(),
                validation: Some(Box::new(|sequence: &AnimationSequence| {
                    assert_eq!(pixel(sequence, 0, 0, 0), [10, 20, 30, 0]);
                    assert_eq!(pixel(sequence, 0, 1, 0), [40, 50, 60, 128]);
                    assert_eq!(pixel(sequence, 0, 2, 0), [70, 80, 90, 255]);
                    assert_eq!(pixel(sequence, 0, 3, 0), [100, 110, 120, 255]);
                })),
            },
            TestCase {
                name: "Grayscale 1-bit",
                image: WriterImage::still(header(8, 1, 1, 0), vec![0b1010_0001]),
                options: DecodeOptions::default(),
                validation: Some(Box::new(|sequence: &AnimationSequence| {
                    let grays: Vec<u8> = sequence.frame(0).unwrap().pixels().chunks(4).map(|p| p[0]).collect();
                    assert_eq!(grays, vec![255, 0, 255, 0, 0, 0, 0, 255]);
                    assert_eq!(pixel(sequence, 0, 0, 0)[3], 255);
                })),
            },
            TestCase {
                name: "RGB 16-bit",
                image: WriterImage::still(header(1, 1, 16, 2), vec![0x12, 0x34, 0x56, 0x78, 0x9A, 0xBC]),
                options: DecodeOptions::default(),
                validation: Some(Box::new(|sequence: &AnimationSequence| {
                    assert_eq!(pixel(sequence, 0, 0, 0), [0x12, 0x56, 0x9A, 255]);
                })),
            },
            TestCase {
                name: "Grayscale alpha",
                image: WriterImage::still(header(1, 1, 8, 4), vec![100, 50]),
                options: DecodeOptions::default(),
                validation: Some(Box::new(|sequence: &AnimationSequence| {
                    assert_eq!(pixel(sequence, 0, 0, 0), [100, 100, 100, 50]);
                })),
            },
            TestCase {
                name: "RGB color key",
                image: color_key,
                options: DecodeOptions::default(),
                validation: Some(Box::new(|sequence: &AnimationSequence| {
                    assert_eq!(pixel(sequence, 0, 0, 0), [1, 2, 3, 0]);
                    assert_eq!(pixel(sequence, 0, 1, 0), [4, 5, 6, 255]);
                })),
            },
        ];

        for test_case in test_cases {
            test_decode(test_case)?;
        }

        Ok(())
    }

    #[test]
    fn test_filters() -> Result<(), Box<dyn std::error::Error>> {
        let filters = [
            WriterFilter::None,
            WriterFilter::Sub,
            WriterFilter::Up,
            WriterFilter::Average,
            WriterFilter::Paeth,
        ];

        for filter in filters {
            let mut image = WriterImage::still(WriterHeader::rgba8(5, 3), gradient(5, 3, 4));
            image.filter = filter;

            let sequence = apng_player::decode(&Writer::encode_apng(&image)?, &DecodeOptions::default())?;
            assert_eq!(sequence.frame(0).unwrap().pixels(), &gradient(5, 3, 4)[..], "{:?}", filter);

            let mut rgb = WriterImage::still(header(4, 3, 8, 2), gradient(4, 3, 3));
            rgb.filter = filter;

            let sequence = apng_player::decode(&Writer::encode_apng(&rgb)?, &DecodeOptions::default())?;
            let expected: Vec<u8> = gradient(4, 3, 3)
                .chunks(3)
                .flat_map(|p| [p[0], p[1], p[2], 255])
                .collect();
            assert_eq!(sequence.frame(0).unwrap().pixels(), &expected[..], "{:?}", filter);
        }

        Ok(())
    }

    #[test]
    fn test_interlaced() -> Result<(), Box<dyn std::error::Error>> {
        for (width, height) in [(9, 9), (1, 1), (3, 5)] {
            let mut header = WriterHeader::rgba8(width, height);
            header.interlaced = true;

            let mut image = WriterImage::still(header, gradient(width, height, 4));
            image.filter = WriterFilter::Paeth;

            let sequence = apng_player::decode(&Writer::encode_apng(&image)?, &DecodeOptions::default())?;
            assert_eq!(sequence.frame(0).unwrap().pixels(), &gradient(width, height, 4)[..]);
        }

        let mut header = WriterHeader::rgba8(2, 2);
        header.interlaced = true;
        let mut animated = three_frames();
        animated.header = header;

        let sequence = apng_player::decode(&Writer::encode_apng(&animated)?, &DecodeOptions::default())?;
        assert_eq!(pixel(&sequence, 1, 1, 1), GREEN);

        Ok(())
    }

    #[test]
    fn test_disposal_and_blending() -> Result<(), Box<dyn std::error::Error>> {
        let frames = vec![
            WriterImageFrame::solid(2, 2, RED).with_dispose(1),
            WriterImageFrame::solid(1, 1, BLUE).with_offset(1, 1),
        ];
        let data = Writer::encode_apng(&WriterImage::new(WriterHeader::rgba8(2, 2), frames))?;
        let sequence = apng_player::decode(&data, &DecodeOptions::default())?;

        assert_eq!(pixel(&sequence, 0, 0, 0), RED);
        assert_eq!(pixel(&sequence, 1, 0, 0), CLEAR);
        assert_eq!(pixel(&sequence, 1, 1, 1), BLUE);

        let frames = vec![
            WriterImageFrame::solid(2, 2, RED),
            WriterImageFrame::solid(1, 1, BLUE).with_dispose(2),
            WriterImageFrame::solid(1, 1, GREEN).with_offset(1, 1),
        ];
        let data = Writer::encode_apng(&WriterImage::new(WriterHeader::rgba8(2, 2), frames))?;
        let sequence = apng_player::decode(&data, &DecodeOptions::default())?;

        assert_eq!(pixel(&sequence, 1, 0, 0), BLUE);
        assert_eq!(pixel(&sequence, 2, 0, 0), RED);
        assert_eq!(pixel(&sequence, 2, 1, 1), GREEN);

        let frames = vec![
            WriterImageFrame::solid(1, 1, RED),
            WriterImageFrame::solid(1, 1, [0, 0, 255, 128]).with_blend(1),
            WriterImageFrame::solid(1, 1, [0, 0, 255, 128]),
        ];
        let data = Writer::encode_apng(&WriterImage::new(WriterHeader::rgba8(1, 1), frames))?;
        let sequence = apng_player::decode(&data, &DecodeOptions::default())?;

        assert_eq!(pixel(&sequence, 1, 0, 0), [127, 0, 128, 255]);
        assert_eq!(pixel(&sequence, 2, 0, 0), [0, 0, 255, 128]);

        Ok(())
    }

    #[test]
    fn test_decode_errors() -> Result<(), Box<dyn std::error::Error>> {
        let valid = Writer::encode_apng(&three_frames())?;

        let mut bad_crc = valid.clone();
        assert!(Writer::corrupt_crc(&mut bad_crc, b"fcTL"));

        let (idat_offset, _) = Writer::find_chunk(&valid, b"IDAT").ok_or("fixture has no IDAT")?;
        let truncated = valid[..idat_offset + 10].to_vec();

        let mut header_not_first = PNG_SIGNATURE.to_vec();
        Writer::write_chunk(&mut header_not_first, b"tEXt", b"Comment\0hi");
        header_not_first.extend_from_slice(&valid[8..]);

        let mut bad_zlib = valid[..33].to_vec();
        Writer::write_chunk(&mut bad_zlib, b"IDAT", &[1, 2, 3, 4]);
        Writer::write_chunk(&mut bad_zlib, b"IEND", &[]);

        let out_of_bounds = Writer::encode_apng(&WriterImage::new(
            WriterHeader::rgba8(2, 2),
            vec![
                WriterImageFrame::solid(2, 2, RED),
                WriterImageFrame::solid(2, 2, BLUE).with_offset(1, 1),
            ],
        ))?;

        let oversized_frame = Writer::encode_apng(&WriterImage::new(
            WriterHeader::rgba8(2, 2),
            vec![WriterImageFrame::solid(3, 3, RED)],
        ))?;

        let mut huge_frame = valid.clone();
        let huge = [u32::MAX.to_be_bytes(), u32::MAX.to_be_bytes()].concat();
        assert!(Writer::patch_chunk(&mut huge_frame, b"fcTL", 4, &huge));

        let unsupported = Writer::encode_apng(&WriterImage::still(header(2, 1, 4, 2), vec![0, 0, 0]))?;

        let error_cases = vec![
            ErrorCase {
                name: "Empty buffer",
                data: Vec::new(),
                options: DecodeOptions::default(),
                expected: |e| matches!(e, ApngError::EmptyBuffer),
            },
            ErrorCase {
                name: "Bad signature",
                data: b"GIF89a not a png".to_vec(),
                options: DecodeOptions::default(),
                expected: |e| matches!(e, ApngError::InvalidSignature),
            },
            ErrorCase {
                name: "Signature only",
                data: PNG_SIGNATURE.to_vec(),
                options: DecodeOptions::default(),
                expected: |e| matches!(e, ApngError::MissingHeader),
            },
            ErrorCase {
                name: "Header not first",
                data: header_not_first,
                options: DecodeOptions::default(),
                expected: |e| matches!(e, ApngError::MissingHeader),
            },
            ErrorCase {
                name: "Truncated chunk",
                data: truncated,
                options: DecodeOptions::default(),
                expected: |e| matches!(e, ApngError::TruncatedChunk { .. }),
            },
            ErrorCase {
                name: "CRC mismatch",
                data: bad_crc,
                options: DecodeOptions::default(),
                expected: |e| matches!(e, ApngError::CorruptChunk { chunk, .. } if chunk == "fcTL"),
            },
            ErrorCase {
                name: "Invalid zlib stream",
                data: bad_zlib,
                options: DecodeOptions::default(),
                expected: |e| matches!(e, ApngError::InflateFailure(_)),
            },
            ErrorCase {
                name: "Frame outside canvas",
                data: out_of_bounds,
                options: DecodeOptions::default(),
                expected: |e| matches!(e, ApngError::FrameOutOfBounds { frame: 1, .. }),
            },
            ErrorCase {
                name: "Frame larger than canvas",
                data: oversized_frame,
                options: DecodeOptions::default(),
                expected: |e| matches!(e, ApngError::FrameOutOfBounds { frame: 0, width: 3, height: 3, .. }),
            },
            ErrorCase {
                name: "Frame size overflows",
                data: huge_frame,
                options: DecodeOptions::default(),
                expected: |e| matches!(e, ApngError::FrameOutOfBounds { frame: 0, width: u32::MAX, .. }),
            },
            ErrorCase {
                name: "Unsupported bit depth",
                data: unsupported,
                options: DecodeOptions::default(),
                expected: |e| matches!(e, ApngError::UnsupportedFormat(_)),
            },
            ErrorCase {
                name: "Invalid fallback fps",
                data: valid.clone(),
                options: DecodeOptions::default().with_fallback_fps(0.0),
                expected: |e| matches!(e, ApngError::InvalidArgument(_)),
            },
        ];

        for case in error_cases {
            match apng_player::decode(&case.data, &case.options) {
                Ok(_) => panic!("{} decoded successfully", case.name),
                Err(e) => assert!((case.expected)(&e), "{}: unexpected error {:?}", case.name, e),
            }
        }

        Ok(())
    }

    #[test]
    fn test_default_image_needs_first_sequence_number() -> Result<(), Box<dyn std::error::Error>> {
        let mut data = Writer::encode_apng(&three_frames())?;
        assert!(Writer::patch_chunk(&mut data, b"fcTL", 0, &5u32.to_be_bytes()));

        // The fcTL before IDAT is left without frame data of its own
        match apng_player::decode(&data, &DecodeOptions::default()) {
            Ok(_) => panic!("default image was used as a frame"),
            Err(e) => assert!(matches!(e, ApngError::CorruptChunk { .. }), "unexpected error {:?}", e),
        }

        Ok(())
    }

    #[test]
    fn test_crc_check_can_be_disabled() -> Result<(), Box<dyn std::error::Error>> {
        let mut data = Writer::encode_apng(&three_frames())?;
        Writer::corrupt_crc(&mut data, b"IDAT");

        let sequence = apng_player::decode(&data, &DecodeOptions::default().with_crc_check(false))?;
        assert_eq!(sequence.frame_count(), 3);

        Ok(())
    }

    #[test]
    fn test_decoding_is_deterministic() -> Result<(), Box<dyn std::error::Error>> {
        let data = Writer::encode_apng(&three_frames())?;
        let first = apng_player::decode(&data, &DecodeOptions::default())?;
        let second = apng_player::decode(&data, &DecodeOptions::default())?;

        assert_eq!(first, second);

        Ok(())
    }

    #[test]
    fn test_chunk_walk() -> Result<(), Box<dyn std::error::Error>> {
        let data = Writer::encode_apng(&three_frames())?;
        let types = ChunkReader::new(&data, true)?
            .map(|chunk| chunk.map(|chunk| chunk.chunk_type))
            .collect::<Result<Vec<_>, _>>()?;

        assert_eq!(types.first(), Some(&ChunkType::IHDR));
        assert_eq!(types.last(), Some(&ChunkType::IEND));
        assert_eq!(types.iter().filter(|&&t| t == ChunkType::FCTL).count(), 3);
        assert_eq!(types.iter().filter(|&&t| t == ChunkType::FDAT).count(), 2);

        Ok(())
    }

    #[test]
    fn test_probe() -> Result<(), Box<dyn std::error::Error>> {
        let mut image = three_frames();
        image.num_plays = 2;

        let apng = Apng::new(Writer::encode_apng(&image)?);
        let info = apng.probe()?;

        assert_eq!((info.width, info.height), (2, 2));
        assert!(info.animated);
        assert!(info.default_image_is_frame);
        assert_eq!(info.frame_count, 3);
        assert_eq!(info.declared_frame_count, Some(3));
        assert_eq!(info.play_count, 2);
        assert_eq!(info.total_duration_ms, 500.0);

        let json = serde_json::to_value(&info)?;
        assert_eq!(json["frame_count"], 3);
        assert_eq!(json["frames"][1]["delay_num"], 15);

        let text = info.to_string();
        assert!(text.contains("500"));

        Ok(())
    }

    #[test]
    fn test_playback_scenario() -> Result<(), Box<dyn std::error::Error>> {
        let changes = Rc::new(RefCell::new(Vec::new()));
        let loops = Rc::new(Cell::new(0));

        let seen = Rc::clone(&changes);
        let looped = Rc::clone(&loops);
        let callbacks = Callbacks::new()
            .with_on_frame_change(move |index| seen.borrow_mut().push(index))
            .with_on_loop(move || looped.set(looped.get() + 1));

        let clock = Rc::new(ManualClock::new());
        let sequence = Arc::new(apng_player::decode(&Writer::encode_apng(&three_frames())?, &DecodeOptions::default())?);

        let mut engine = PlaybackEngine::builder(sequence)
            .callbacks(callbacks)
            .clock(clock.clone())
            .build()?;

        let mut progress = Vec::new();
        for (delta, expected_frame) in [(50.0, 0), (60.0, 1), (150.0, 2), (200.0, 2)] {
            clock.advance(delta, [&mut engine])?;
            assert_eq!(engine.current_frame()?, expected_frame);
            progress.push(engine.progress()?);
        }

        assert!(progress.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(loops.get(), 0);

        clock.advance(100.0, [&mut engine])?;
        assert_eq!(engine.current_time()?, 60.0);
        assert_eq!(engine.current_frame()?, 0);
        assert_eq!(loops.get(), 1);
        assert_eq!(*changes.borrow(), vec![1, 2, 0]);

        Ok(())
    }

    #[test]
    fn test_playback_completes_once() -> Result<(), Box<dyn std::error::Error>> {
        let completions = Rc::new(Cell::new(0));
        let done = Rc::clone(&completions);

        let apng = Apng::new(Writer::encode_apng(&three_frames())?);
        let mut engine = apng.into_engine(PlaybackOptions::default().with_loop(false))?;
        engine.set_callbacks(Callbacks::new().with_on_complete(move || done.set(done.get() + 1)))?;

        for _ in 0..20 {
            engine.update(100.0)?;
        }

        assert_eq!(completions.get(), 1);
        assert!(!engine.is_playing());
        assert_eq!(engine.current_frame()?, 2);

        Ok(())
    }

    #[test]
    fn test_clones_share_frames() -> Result<(), Box<dyn std::error::Error>> {
        let apng = Apng::new(Writer::encode_apng(&three_frames())?);
        let mut engine = apng.into_engine(PlaybackOptions::default().with_auto_play(false))?;
        let mut clone = engine.try_clone()?;

        assert!(std::ptr::eq(engine.current_pixels()?.as_ptr(), clone.current_pixels()?.as_ptr()));

        clone.seek(2)?;
        assert_eq!(engine.current_frame()?, 0);
        assert_eq!(clone.current_frame()?, 2);

        assert!(clone.seek(3).is_err());
        assert_eq!(clone.current_frame()?, 2);
        assert_eq!(clone.current_time()?, 250.0);

        engine.dispose()?;
        assert_eq!(clone.total_frames()?, 3);

        Ok(())
    }

    #[test]
    fn test_sprite_presents_frames() -> Result<(), Box<dyn std::error::Error>> {
        let apng = Apng::new(Writer::encode_apng(&three_frames())?);
        let engine = apng.into_engine(PlaybackOptions::default())?;
        let mut sprite = AnimatedSprite::new(engine, PixelBuffer::new());

        assert!(sprite.render()?);
        assert_eq!(&sprite.surface().pixels[0..4], &RED);

        assert!(!sprite.update(10.0)?);
        assert!(sprite.update(100.0)?);
        assert_eq!(&sprite.surface().pixels[0..4], &GREEN);
        assert_eq!(sprite.surface().uploads, 2);

        Ok(())
    }
}
