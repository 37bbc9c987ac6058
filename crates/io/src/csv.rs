// CSV/TSV reading and writing for import batches and the tracking sheet

use std::io::Read;
use std::path::Path;

/// Read a delimited file into rows of raw, untrimmed fields. The
/// delimiter is sniffed from the first lines.
pub fn read_table(path: &Path) -> Result<Vec<Vec<String>>, String> {
    let content = read_file_as_utf8(path)?;
    let delimiter = sniff_delimiter(&content);
    parse_table(&content, delimiter)
}

/// Detect the most likely field delimiter by checking consistency across the first few lines.
///
/// For each candidate (tab, semicolon, comma, pipe), count fields per line. The delimiter
/// that produces the most consistent field count (>1 field) wins.
pub fn sniff_delimiter(content: &str) -> u8 {
    let candidates: &[u8] = &[b'\t', b';', b',', b'|'];
    let sample_lines: Vec<&str> = content.lines().take(10).collect();

    if sample_lines.is_empty() {
        return b',';
    }

    let mut best = b',';
    let mut best_score = 0u64;

    for &delim in candidates {
        let counts: Vec<usize> = sample_lines
            .iter()
            .map(|line| {
                csv::ReaderBuilder::new()
                    .delimiter(delim)
                    .has_headers(false)
                    .flexible(true)
                    .from_reader(line.as_bytes())
                    .records()
                    .next()
                    .and_then(|r| r.ok())
                    .map(|r| r.len())
                    .unwrap_or(1)
            })
            .collect();

        if counts.first().copied().unwrap_or(0) <= 1 {
            continue;
        }

        // Score: (lines with the same field count as line 1) * field_count
        let target = counts[0];
        let consistent = counts.iter().filter(|&&c| c == target).count() as u64;
        let score = consistent * target as u64;

        if score > best_score {
            best_score = score;
            best = delim;
        }
    }

    best
}

/// Read file and convert to UTF-8 if needed (handles Windows-1252, Latin-1, etc.)
pub fn read_file_as_utf8(path: &Path) -> Result<String, String> {
    let mut file = std::fs::File::open(path).map_err(|e| e.to_string())?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes).map_err(|e| e.to_string())?;

    let text = match String::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => {
            let bytes = e.into_bytes();
            // Excel on Windows exports "NÚMERO GUIA" as Windows-1252
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
            decoded.into_owned()
        }
    };
    Ok(text.trim_start_matches('\u{feff}').to_string())
}

pub fn parse_table(content: &str, delimiter: u8) -> Result<Vec<Vec<String>>, String> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| e.to_string())?;
        rows.push(record.iter().map(str::to_string).collect());
    }
    Ok(rows)
}

/// Write rows to `path` through a sibling temp file so a crash never leaves a
/// half-written sheet behind.
pub fn write_table(path: &Path, rows: &[Vec<String>]) -> Result<(), String> {
    let tmp = path.with_extension("csv.tmp");
    {
        let mut writer = csv::WriterBuilder::new()
            .flexible(true)
            .from_path(&tmp)
            .map_err(|e| e.to_string())?;
        for row in rows {
            writer.write_record(row).map_err(|e| e.to_string())?;
        }
        writer.flush().map_err(|e| e.to_string())?;
    }
    std::fs::rename(&tmp, path).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sniffs_semicolon() {
        let content = "ID;NÚMERO GUIA;ESTATUS\nA1;999;PENDIENTE\nA2;998;ENTREGADO\n";
        assert_eq!(sniff_delimiter(content), b';');
    }

    #[test]
    fn sniffs_tab() {
        let content = "ID\tNÚMERO GUIA\tESTATUS\nA1\t999\tPENDIENTE\n";
        assert_eq!(sniff_delimiter(content), b'\t');
    }

    #[test]
    fn empty_defaults_to_comma() {
        assert_eq!(sniff_delimiter(""), b',');
    }

    #[test]
    fn quoted_fields() {
        let rows = parse_table("ID,ESTATUS\nA1,\"EN CAMINO, BOGOTÁ\"\n", b',').unwrap();
        assert_eq!(rows[1], vec!["A1".to_string(), "EN CAMINO, BOGOTÁ".to_string()]);
    }

    #[test]
    fn windows_1252_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("latin.csv");
        // "NÚMERO" with Ú = 0xDA in Windows-1252
        std::fs::write(&path, b"ID,N\xDAMERO GUIA\n").unwrap();
        let text = read_file_as_utf8(&path).unwrap();
        assert!(text.starts_with("ID,NÚMERO GUIA"));
    }

    #[test]
    fn write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sheet.csv");
        let rows = vec![
            vec!["A".to_string(), "B".to_string()],
            vec!["1".to_string(), "x,y".to_string()],
        ];
        write_table(&path, &rows).unwrap();
        assert_eq!(read_table(&path).unwrap(), rows);
        assert!(!dir.path().join("sheet.csv.tmp").exists());
    }
}
