//! Reading and writing of WAV files.
//!
//! Reads wave files into memory as vectors of samples. The resulting struct
//! contains the FMT info and the sample data; chunks other than FMT and DATA
//! are skipped. Robustness stops at what sample loading needs: a file
//! without a valid RIFF/WAVE container, or without FMT and DATA chunks, is
//! rejected with a logged error.
//!
//! Writes sample data back out as a minimal fmt + data file.

use crate::wav_data::*;

use std::fs::File;
use std::io::{Read, Write, Seek, SeekFrom, BufReader};

use log::{debug, error, info, trace};

// List of Chunk IDs as u32 values (little endian)
const CID_RIFF: u32 = 0x46464952;
const CID_WAVE: u32 = 0x45564157;
const CID_FMT:  u32 = 0x20746d66;
const CID_DATA: u32 = 0x61746164;

const SIZE_WAVE_HEADER: u32 = 4;
const SIZE_CHUNK_HEADER: u32 = 8;
const SIZE_FMT_CHUNK: u32 = SIZE_CHUNK_HEADER + 16;

pub struct WavHandler;

impl WavHandler {
    /// Read a file with the given filename.
    ///
    /// ``` no_run
    /// use wavebank::WavHandler;
    ///
    /// # fn main() -> Result<(), ()> {
    ///
    /// let wave_data = WavHandler::read_file("test.wav")?;
    ///
    /// # Ok(())
    /// # }
    /// ```
    pub fn read_file(filename: &str) -> Result<WavData, ()> {
        if filename.is_empty() {
            return Err(());
        }
        info!("Reading wave file [{}]", filename);
        let result = File::open(filename);
        if let Ok(file) = result {
            let reader = BufReader::new(file);
            WavHandler::read_content(reader)
        } else {
            error!("Unable to open file [{}]", filename);
            Err(())
        }
    }

    /// Read wave data from the provided input stream.
    ///
    /// Source is any stream object implementing Read and Seek.
    ///
    /// ```
    /// use wavebank::WavHandler;
    /// use std::io::Cursor;
    ///
    /// let data: &[u8] = &[0x00]; // Some buffer with wave data
    /// let buffer = Cursor::new(data);
    /// let result = WavHandler::read_content(buffer);
    /// assert!(result.is_err()); // Not a valid file
    /// ```
    pub fn read_content<R: Read + Seek>(mut source: R) -> Result<WavData, ()> {
        let size = WavHandler::read_riff_container(&mut source, CID_WAVE)?;

        let mut fmt = FmtChunk::default();
        let mut fmt_found = false;
        let mut samples: Option<WavSamples> = None;
        let mut bytes_read: usize = 4; // Already read the 4 bytes of file type

        // Read chunks
        loop {
            let (chunk_id, chunk_size) = match WavHandler::read_chunk_header(&mut source) {
                Ok(header) => header,
                Err(()) => break, // Error or finished reading file. In both cases evaluate what was read.
            };
            debug!("Reading {} chunk, size {}", WavHandler::get_id_name(chunk_id), chunk_size);
            match chunk_id {
                CID_FMT => {
                    fmt = WavHandler::read_fmt_chunk(&mut source, chunk_size as usize)?;
                    fmt_found = true;
                }
                CID_DATA => {
                    samples = Some(WavHandler::read_samples(&mut source,
                                                           chunk_size as usize,
                                                           fmt.format_tag,
                                                           fmt.bits_per_sample)?);
                }
                _ => WavHandler::skip_chunk(&mut source, chunk_size)?,
            }
            bytes_read += (chunk_size + SIZE_CHUNK_HEADER) as usize;
        }
        if bytes_read == size {
            debug!("Finished reading {} bytes", bytes_read);
        } else {
            error!("Invalid file size, read {} bytes, expected {}", bytes_read, size);
        }
        if !fmt_found {
            error!("Invalid file format, format chunk missing");
            return Err(());
        }
        match samples {
            Some(samples) => Ok(WavData::new_raw(fmt, samples)),
            None => {
                error!("Invalid file format, data chunk missing");
                Err(())
            }
        }
    }

    // Read the RIFF container information from the input stream.
    //
    // This expects a RIFF header, followed by a 4-byte identifier (e.g.
    // "WAVE"), which is passed as argument.
    fn read_riff_container<R: Read>(source: &mut R, expected_cid: u32) -> Result<usize, ()> {
        let (chunk_id, size) = WavHandler::read_chunk_header(source)?;
        if chunk_id != CID_RIFF {
            error!("Unexpected chunk ID, expected RIFF, found {}", WavHandler::get_id_name(chunk_id));
            return Err(());
        }
        // RIFF header is followed by 4 bytes giving the file type
        let file_type = WavHandler::read_u32(source)?;
        debug!("File type: {}", WavHandler::get_id_name(file_type));
        if file_type != expected_cid {
            error!("Unexpected file type, expected {}, found {}",
                WavHandler::get_id_name(expected_cid), WavHandler::get_id_name(file_type));
            return Err(());
        }
        Ok(size as usize)
    }

    // Read a chunk ID and chunk size from the input stream.
    fn read_chunk_header<R: Read>(source: &mut R) -> Result<(u32, u32), ()> {
        let chunk_id = WavHandler::read_u32(source)?;
        let size = WavHandler::read_u32(source)?;
        trace!("Read chunk header, id {:#x}, size {}", chunk_id, size);
        Ok((chunk_id, size))
    }

    fn read_u32<R: Read>(source: &mut R) -> Result<u32, ()> {
        let mut bytes = [0u8; 4];
        if source.read_exact(&mut bytes).is_err() {
            // Might have reached the end of the file, signal nothing was read
            return Err(());
        }
        Ok(u32::from_le_bytes(bytes))
    }

    fn read_u16<R: Read>(source: &mut R) -> Result<u16, ()> {
        let mut bytes = [0u8; 2];
        if source.read_exact(&mut bytes).is_err() {
            return Err(());
        }
        Ok(u16::from_le_bytes(bytes))
    }

    // Read the contents of the FMT chunk.
    //
    // The chunk header is assumed to have been read already. Only the 16
    // base bytes are evaluated, extension fields are skipped.
    fn read_fmt_chunk<R: Read + Seek>(source: &mut R, size: usize) -> Result<FmtChunk, ()> {
        if size < 16 {
            error!("Format chunk too small, {} bytes", size);
            return Err(());
        }
        let fmt = FmtChunk {
            format_tag: WavHandler::read_u16(source)?,
            num_channels: WavHandler::read_u16(source)?,
            sample_rate: WavHandler::read_u32(source)?,
            avg_data_rate: WavHandler::read_u32(source)?,
            block_align: WavHandler::read_u16(source)?,
            bits_per_sample: WavHandler::read_u16(source)?,
        };
        if size > 16 {
            WavHandler::skip_chunk(source, (size - 16) as u32)?;
        }
        debug!("Read fmt chunk: {:?}", fmt);
        Ok(fmt)
    }

    // Read samples into a buffer matching the data format.
    fn read_samples<R: Read>(source: &mut R, num_bytes: usize, format_tag: u16, bits_per_sample: u16) -> Result<WavSamples, ()> {
        let mut bytes = vec![0u8; num_bytes];
        if source.read_exact(&mut bytes).is_err() {
            error!("Incomplete sample data");
            return Err(());
        }
        info!("{} bytes of sample data, format {}, {} bits per sample",
            num_bytes, format_tag, bits_per_sample);
        match format_tag {
            FMT_PCM => match bits_per_sample {
                8 => Ok(WavSamples::Pcm8(bytes)),
                16 => Ok(WavSamples::Pcm16(bytes.chunks_exact(2)
                        .map(|b| i16::from_le_bytes([b[0], b[1]]))
                        .collect())),
                _ => Err(()),
            },
            FMT_FLOAT => match bits_per_sample {
                32 => Ok(WavSamples::Float32(bytes.chunks_exact(4)
                        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                        .collect())),
                _ => Err(()),
            },
            _ => {
                error!("Unsupported sample format {} with {} bits per sample",
                    format_tag, bits_per_sample);
                Err(())
            }
        }
    }

    // Skip over the rest of the current chunk to the next header.
    fn skip_chunk<R: Read + Seek>(source: &mut R, num_bytes: u32) -> Result<(), ()> {
        match source.seek(SeekFrom::Current(num_bytes as i64)) {
            Ok(_) => Ok(()),
            Err(_) => Err(()),
        }
    }

    // Convert a given chunk ID from u32 to printable string.
    fn get_id_name(value: u32) -> String {
        let bytes = value.to_le_bytes();
        String::from_utf8_lossy(&bytes).into_owned()
    }

    // ====================
    // Writing of WAV files
    // ====================

    /// Write the given WavData to a file.
    ///
    /// This writes the fmt chunk and the sample data to the file.
    pub fn write_file(data: &WavData, filename: &str) -> Result<(), ()> {
        let result = File::create(filename);
        if let Ok(mut file) = result {
            if WavHandler::write_content(&mut file, data).is_err() {
                error!("Writing file [{}] failed", filename);
                return Err(());
            }
            Ok(())
        } else {
            error!("Unable to create file [{}]", filename);
            Err(())
        }
    }

    // Write the WAV data to the given output stream.
    fn write_content<W: Write>(dest: &mut W, data: &WavData) -> Result<(), std::io::Error> {
        // Calculate size:
        // - 4 bytes for "WAVE" header
        // - 24 bytes for fmt chunk
        // - 8 + data size for sample data
        let size = SIZE_WAVE_HEADER + SIZE_FMT_CHUNK
            + SIZE_CHUNK_HEADER + data.num_bytes() as u32;

        // Write RIFF header + size
        dest.write_all(&CID_RIFF.to_le_bytes())?;
        dest.write_all(&size.to_le_bytes())?;

        // Write WAVE header
        dest.write_all(&CID_WAVE.to_le_bytes())?;

        // Write fmt chunk
        let fmt = data.get_fmt();
        dest.write_all(&CID_FMT.to_le_bytes())?;
        dest.write_all(&16u32.to_le_bytes())?;
        dest.write_all(&fmt.format_tag.to_le_bytes())?;
        dest.write_all(&fmt.num_channels.to_le_bytes())?;
        dest.write_all(&fmt.sample_rate.to_le_bytes())?;
        dest.write_all(&fmt.avg_data_rate.to_le_bytes())?;
        dest.write_all(&fmt.block_align.to_le_bytes())?;
        dest.write_all(&fmt.bits_per_sample.to_le_bytes())?;

        // Write data chunk
        dest.write_all(&CID_DATA.to_le_bytes())?;
        dest.write_all(&(data.num_bytes() as u32).to_le_bytes())?;
        let num_bytes = WavHandler::write_samples(dest, data.get_samples())?;

        // Pad to an even chunk length
        if (num_bytes & 0x01) == 0x01 {
            dest.write_all(&[0x00])?;
        }
        Ok(())
    }

    // Write the sample data in little endian byte order.
    fn write_samples<W: Write>(dest: &mut W, samples: &WavSamples) -> Result<usize, std::io::Error> {
        match samples {
            WavSamples::Pcm8(v) => {
                dest.write_all(v)?;
            }
            WavSamples::Pcm16(v) => {
                for sample in v {
                    dest.write_all(&sample.to_le_bytes())?;
                }
            }
            WavSamples::Float32(v) => {
                for sample in v {
                    dest.write_all(&sample.to_le_bytes())?;
                }
            }
        }
        Ok(samples.num_bytes())
    }
}

// ----------------------------------------------
//                  Unit tests
// ----------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn read(bytes: &[u8]) -> Result<WavData, ()> {
        WavHandler::read_content(Cursor::new(bytes))
    }

    fn write(data: &WavData) -> Vec<u8> {
        let mut buffer = Vec::new();
        WavHandler::write_content(&mut buffer, data).unwrap();
        buffer
    }

    #[test]
    fn incomplete_riff_header_is_rejected() {
        assert!(read(b"RIF").is_err());
        assert!(read(b"RIFF\x04\x00\x00\x00").is_err());
        assert!(read(b"RIFF\x04\x00\x00\x00WAV").is_err());
    }

    #[test]
    fn wrong_container_ids_are_rejected() {
        assert!(read(b"Rxxx\x04\x00\x00\x00WAVE").is_err());
        assert!(read(b"RIFF\x04\x00\x00\x00WOVE").is_err());
    }

    #[test]
    fn empty_wave_is_rejected() {
        // Valid container, but no fmt or data chunk
        assert!(read(b"RIFF\x04\x00\x00\x00WAVE").is_err());
    }

    #[test]
    fn truncated_fmt_chunk_is_rejected() {
        let bytes: &[u8] = &[
            b'R', b'I', b'F', b'F',
            0x04, 0x00, 0x00, 0x00,
            b'W', b'A', b'V', b'E',
            // fmt chunk with invalid size
            b'f', b'm', b't', b' ',
            0x02, 0x00, 0x00, 0x00,
            0x42, 0x42,
        ];
        assert!(read(bytes).is_err());
    }

    #[test]
    fn pcm16_samples_can_be_read() {
        let bytes: &[u8] = &[
            b'R', b'I', b'F', b'F',
            0x26, 0x00, 0x00, 0x00,
            b'W', b'A', b'V', b'E',
            // fmt chunk
            b'f', b'm', b't', b' ',
            0x10, 0x00, 0x00, 0x00,
            0x01, 0x00,             // PCM
            0x01, 0x00,             // 1 channel
            0x44, 0xAC, 0x00, 0x00, // 44100 Hz
            0x88, 0x58, 0x01, 0x00, // Avg data rate
            0x00, 0x00,             // Block align
            0x10, 0x00,             // 16 bit per sample
            // data chunk
            b'd', b'a', b't', b'a',
            0x02, 0x00, 0x00, 0x00,
            0x12, 0x34,
        ];
        let wav = read(bytes).unwrap();
        assert_eq!(wav.get_fmt().sample_rate, 44100);
        assert_eq!(wav.get_samples(), &WavSamples::Pcm16(vec![0x3412]));
    }

    #[test]
    fn unknown_chunks_are_skipped() {
        let bytes: &[u8] = &[
            b'R', b'I', b'F', b'F',
            0x2F, 0x00, 0x00, 0x00,
            b'W', b'A', b'V', b'E',
            // unknown chunk
            b'n', b'u', b'l', b'l',
            0x01, 0x00, 0x00, 0x00,
            0xFF,
            // fmt chunk
            b'f', b'm', b't', b' ',
            0x10, 0x00, 0x00, 0x00,
            0x01, 0x00,
            0x01, 0x00,
            0x44, 0xAC, 0x00, 0x00,
            0x44, 0xAC, 0x00, 0x00,
            0x00, 0x00,
            0x08, 0x00,             // 8 bit per sample
            // data chunk
            b'd', b'a', b't', b'a',
            0x02, 0x00, 0x00, 0x00,
            0x42, 0x43,
        ];
        let wav = read(bytes).unwrap();
        assert_eq!(wav.get_samples(), &WavSamples::Pcm8(vec![0x42, 0x43]));
    }

    #[test]
    fn float_samples_can_be_read() {
        let bytes: &[u8] = &[
            b'R', b'I', b'F', b'F',
            0x28, 0x00, 0x00, 0x00,
            b'W', b'A', b'V', b'E',
            // fmt chunk
            b'f', b'm', b't', b' ',
            0x10, 0x00, 0x00, 0x00,
            0x03, 0x00,             // Float
            0x01, 0x00,
            0x44, 0xAC, 0x00, 0x00,
            0x10, 0xB1, 0x02, 0x00,
            0x00, 0x00,
            0x20, 0x00,             // 32 bit per sample
            // data chunk
            b'd', b'a', b't', b'a',
            0x04, 0x00, 0x00, 0x00,
            0xB6, 0xF3, 0x9D, 0x3F, // = 1.234 in LE format
        ];
        let wav = read(bytes).unwrap();
        assert_eq!(wav.get_samples(), &WavSamples::Float32(vec![1.234]));
    }

    #[test]
    fn unsupported_format_is_rejected() {
        let bytes: &[u8] = &[
            b'R', b'I', b'F', b'F',
            0x26, 0x00, 0x00, 0x00,
            b'W', b'A', b'V', b'E',
            b'f', b'm', b't', b' ',
            0x10, 0x00, 0x00, 0x00,
            0x07, 0x00,             // uLaw
            0x01, 0x00,
            0x44, 0xAC, 0x00, 0x00,
            0x44, 0xAC, 0x00, 0x00,
            0x00, 0x00,
            0x08, 0x00,
            b'd', b'a', b't', b'a',
            0x02, 0x00, 0x00, 0x00,
            0x42, 0x43,
        ];
        assert!(read(bytes).is_err());
    }

    #[test]
    fn pcm16_samples_can_be_written() {
        let data = WavData::new_from_data(WavSamples::Pcm16(vec![-1, 0, 1, 2]), 44100);
        let expected: &[u8] = &[
            b'R', b'I', b'F', b'F',
            0x2C, 0x00, 0x00, 0x00,
            b'W', b'A', b'V', b'E',
            // fmt chunk
            b'f', b'm', b't', b' ',
            0x10, 0x00, 0x00, 0x00,
            0x01, 0x00,             // PCM
            0x01, 0x00,             // 1 channel
            0x44, 0xAC, 0x00, 0x00, // 44100 Hz
            0x88, 0x58, 0x01, 0x00, // Avg data rate
            0x00, 0x00,             // Block align
            0x10, 0x00,             // 16 bit per sample
            // data chunk
            b'd', b'a', b't', b'a',
            0x08, 0x00, 0x00, 0x00, // 4 s16 = 8 bytes
            0xFF, 0xFF, 0x00, 0x00,
            0x01, 0x00, 0x02, 0x00,
        ];
        assert_eq!(write(&data), expected);
    }

    #[test]
    fn odd_number_of_bytes_is_padded() {
        let data = WavData::new_from_data(WavSamples::Pcm8(vec![1, 2, 3]), 44100);
        let written = write(&data);
        // 3 data bytes plus one pad byte, not counted in the chunk size
        assert_eq!(written.len() % 2, 0);
        assert_eq!(&written[written.len() - 4..], &[0x01, 0x02, 0x03, 0x00]);
        assert_eq!(written[40], 0x03); // data chunk size stays at 3
    }

    #[test]
    fn written_data_can_be_read_back() {
        let samples = WavSamples::Pcm16(vec![-1000, 0, 1000, 32767]);
        let data = WavData::new_from_data(samples.clone(), 22050);
        let bytes = write(&data);
        let read_back = read(&bytes).unwrap();
        assert_eq!(read_back.get_fmt().sample_rate, 22050);
        assert_eq!(read_back.get_samples(), &samples);
    }
}
