//! Quote catalogs, one list of candidate message bodies per occasion.
//!
//! The built-in lists ship with the binary. The config file may replace either
//! list wholesale; see [`QuoteCatalog::with_override`].

use crate::occasion::Occasion;

const MORNING_QUOTES: &[&str] = &[
    "Selamat pagi! Awali hari dengan niat yang baik, hasil terbaik akan mengikuti.",
    "Pagi ini adalah kesempatan baru. Jangan sia-siakan, langkah kecil tetap berarti.",
    "Kesuksesan bukan milik orang pintar, tapi milik mereka yang terus berusaha.",
    "Semangat pagi! Fokus pada proses, biarkan hasil menyusul dengan sendirinya.",
    "Hari ini lebih baik dari kemarin, besok lebih baik dari hari ini. Ayo mulai!",
    "Jangan menunggu sempurna untuk memulai. Mulailah, lalu sempurnakan di jalan.",
    "Disiplin adalah jembatan antara tujuan dan pencapaian. Tetap konsisten ya!",
    "Kopi boleh pahit, tapi semangat harus tetap manis. Selamat bekerja!",
    "Setiap pagi kita lahir kembali. Yang kita lakukan hari ini yang paling penting.",
    "Target sudah dekat. Satu hari lagi berarti satu langkah lebih dekat.",
    "Kerja keras hari ini adalah cerita bangga di kemudian hari.",
    "Tidak ada yang instan. Nikmati prosesnya, rayakan setiap kemajuan.",
    "Bangun, bersyukur, lalu berikan yang terbaik. Semangat!",
    "Mimpi tidak akan terwujud dengan sendirinya. Kamu harus bangun dan mewujudkannya.",
];

const EVENING_QUOTES: &[&str] = &[
    "Terima kasih untuk kerja keras hari ini. Saatnya istirahat dan isi ulang energi.",
    "Malam adalah waktu untuk merenung: apa yang sudah baik, apa yang bisa diperbaiki.",
    "Istirahat bukan berarti menyerah. Tidur yang cukup adalah bagian dari persiapan.",
    "Hari ini mungkin berat, tapi kamu berhasil melewatinya. Bangga pada dirimu sendiri.",
    "Tutup hari dengan syukur, buka esok hari dengan harapan.",
    "Setiap usaha hari ini adalah tabungan untuk keberhasilan nanti.",
    "Lepaskan lelah hari ini. Besok kita lanjutkan dengan semangat baru.",
    "Bintang tidak bersinar tanpa gelap. Tetap tenang, semua akan indah pada waktunya.",
    "Jangan bandingkan prosesmu dengan orang lain. Setiap orang punya waktunya sendiri.",
    "Selamat malam! Semoga lelahmu hari ini menjadi berkah.",
    "Sedikit demi sedikit, lama-lama menjadi bukit. Terus melangkah.",
    "Malam ini tidur yang nyenyak, besok kita hajar lagi!",
    "Yang penting bukan seberapa cepat, tapi seberapa konsisten.",
    "Evaluasi hari ini, rencanakan esok hari, lalu beristirahatlah dengan tenang.",
];

/// Candidate quotes for both occasions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteCatalog {
    morning: Vec<String>,
    evening: Vec<String>,
}

impl QuoteCatalog {
    /// The catalog compiled into the binary.
    pub fn builtin() -> Self {
        Self {
            morning: MORNING_QUOTES.iter().map(|q| (*q).to_owned()).collect(),
            evening: EVENING_QUOTES.iter().map(|q| (*q).to_owned()).collect(),
        }
    }

    /// Build a catalog from explicit lists. Emptiness is checked at selection time.
    pub fn new(morning: Vec<String>, evening: Vec<String>) -> Self {
        Self { morning, evening }
    }

    /// Replace the list for one occasion.
    pub fn with_override(mut self, occasion: Occasion, quotes: Vec<String>) -> Self {
        match occasion {
            Occasion::Morning => self.morning = quotes,
            Occasion::Evening => self.evening = quotes,
        }
        self
    }

    pub fn for_occasion(&self, occasion: Occasion) -> &[String] {
        match occasion {
            Occasion::Morning => &self.morning,
            Occasion::Evening => &self.evening,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_builtin_catalogs_are_populated() {
        let catalog = QuoteCatalog::builtin();
        for occasion in Occasion::ALL {
            let quotes = catalog.for_occasion(occasion);
            assert!(!quotes.is_empty(), "{occasion} catalog is empty");
            assert!(quotes.iter().all(|q| !q.trim().is_empty()));
        }
    }

    #[test]
    fn test_builtin_quotes_are_unique() {
        let catalog = QuoteCatalog::builtin();
        for occasion in Occasion::ALL {
            let quotes = catalog.for_occasion(occasion);
            let unique: HashSet<_> = quotes.iter().collect();
            assert_eq!(unique.len(), quotes.len(), "duplicate quote in {occasion}");
        }
    }

    #[test]
    fn test_override_replaces_one_occasion() {
        let catalog =
            QuoteCatalog::builtin().with_override(Occasion::Evening, vec!["only one".into()]);
        assert_eq!(catalog.for_occasion(Occasion::Evening), ["only one".to_owned()]);
        assert_eq!(catalog.for_occasion(Occasion::Morning).len(), MORNING_QUOTES.len());
    }
}
