
use crate::DigSigProcErr;
use crate::utils::wrap_floor;

use super::{GALILEO_E1_B_CODE_LENGTH_CHIPS, REPLICA_LENGTH};

// E1B primary ranging codes, 4092 chips each, hex encoded MSB first.  The table carries
// the PRNs this repo exercises.

const E1B_PRN_01:&str = concat!(
	"CD3462C64C32F2B12583EA49EB4518DAC1C0EAB450D4CE0467664B983D40210F9FA2C53A72D935431189D6FBC874F",
	"5B5EE2868B915B548EF94513D35CB7EECFBE33269167779A2118C720BC73D43CDEB9F4CF699529DE033A00ADAAD99",
	"6180914A36B074F91CDCFADFBF7A524F167573F093B40F0E916F11E251F8BBFA9F811692E5F82635C0F2B3D56F27D",
	"89A8F4634C586A780768E42F89B59E2BD1FBD082708650679E1BDC49E275532F448A469A93A455ECB6A53FF71BCCE",
	"5F9860ACFE89A1E5C44E51A72032AABCF43C4798CE3818BF58DA1D9F011649CA5CAB8880FAEC0E06DA88114880695",
	"F1565ECD2FC30F478D3657AECEEC88154A835E17C154241E41364841A1E9B09D2DD0C71B23D1C2F61682512CE78E3",
	"A55A6709DEDB2F56448B429EB2D03A6EAFEAB05631C5F382033790B1838A6D7E6A30A790E8761C8DB790BA2C76A90",
	"8E966F3129739F47997D26C53C817EF38AB41F7AC3DB99B8AFECFE9AA6287387B3622B2B4E11719DC20BA435FBEB6",
	"7C560CB59EBC88E70FA0DC0BEAE5D53110FDCD1772E8D77CA9C9A9B33DB5FA2A164E9F16A42797FFF65966730A9CE",
	"4C9F02AB8D2CEDC8398D030B9995E6682F5F327EB3EB6BC991FD10DEEC3AA9428BF99EF61D7A2F6E7F7CB95F6044A",
	"5EC474B4FB1217CE25BC1F36FDBC4BE0A3D2BB4D968BE86AF03ADC87B39430530470E4A7032C0CB9D14F50140E9FF",
);

const E1B_PRN_02:&str = concat!(
	"09752C518ADCA2F8758CF20EB835E0ECCF4172B827767CB5C655D71F82EBE66486B43EFA3BDCE37577824A9E1AC43",
	"9A3BE03DD6F5FCB004BAA5BDACE6B3FF1463956DBA4D8D64B36613D1403142B3BE9229D6B2350C047B2EDC80BED2C",
	"42B78783E3B0BE3ED67C85150FAF53DFFCEBC6B6B6F2CF07929E7ABDFA012662AD043C861566BF640F330A7920582",
	"054FC257C3AB3A7356778525303EC637C23965E11F5A2D00A8525B4F6B175C9C09B073365A626B2A986DE646CBDA1",
	"F02AD57A7772241C4731C671ABDC0FEFAF82BFCFF181A1E27D2D2866ACF46C995FD2952C703CD64F1D019C3281F05",
	"59B8D2574ADDDC95C3724848381C53C679F2C3E030EEBD9558D99889752B3D2B0EAC8CF5439132911CEA74AB57CBF",
	"9284CAA590AAD1557F3DD01EF9511477094364426E6A1FE500239A1FEBBE2AC0832C70A1811EFBDF3A1EC3E58A10E",
	"D74EAE5319FD72BCC2AAE86847AAE240A383B7B3EA0E7A82B705221673C45CE3980E961B92BB36B7252F7F807D6C3",
	"CDAFB14799EA17137255D025A70227E5D3ED2D2B0C8195C7C94966F78F50EC060DEF3F31FA570157E97F59BC1F981",
	"D3988821F318B365CBC8F15B5887B1FDEB1A050459AF011C1DFBE99202262F106916B90F864B5D1122BAE44FC99FF",
	"A1CC755B7A9D3FA3234ABF61CFA4B08C48C956958E1048705E1765CE02BF8AD469AA488180FCCED029181AC5D236C",
);

const E1B_PRN_11:&str = concat!(
	"052A77030FB47CE06D5596B0B617BB4FD3ACC6BB757160FF7586C2F758E60BE9DF625F6C5EF289421E23EEAD23762",
	"DCDDBFAA0800601F518F35058C870A70479CD55CBA60721EB9B466D9A595EBE38E895626C8BA4A1ACB9CBC7086F3A",
	"6081646C100838DBBB104145D8CB926B4E757503B8055DABD464591DCDBC2A6383A0385D24DEC4829BD1F0C4DDDFB",
	"CC09519012B5857855952BB35725E5EA8D48A8D58D608553DC9DA19ECDAA3281B22F479E07084224EFE28C1686D96",
	"335954310DC6536073CB8311843AF7EDA27BB8FF166CC0A04FBB89449F119DDC920CF498981275D5D015E994FC76F",
	"936BEB7E6E8B963F5C8D88A11BCA16EF16D8AD0900527293F71C19E9C72CE8F928F879D5192A04D8A25C2867E6EEA",
	"6317976FA731F3EBBE783F534B834C6815B766257816B55E1D28440C61AFAB844DFD9BFEFCEC9443B135884754233",
	"ED61B57A9CCBB00EBEB4B67C53B7F6A1EF53C32B86A0EED7CCBA1C227FAA0D44E807D72DF5222045060DF7B4FC46B",
	"DA5205570C5C3D354622FBF6D88019AF4CAAD9494087C405D1BBE7C8F7121FB7C7F381FA0EFEE1B8702FF95681AEF",
	"6F8467F9DDB686D5B0C7685681A7C06DF1B471900648C3691F303FD90AAE532F048B21F91025F65727DBD7FFD3DC1",
	"3BDBA8BAB451873338F95F4A0EE068DD9DDEEFA6343B7FF890EBE3BAD864AA4F95EB3FD0D88B1A9B7BDBDD5E739EE",
);

const E1B_PRN_20:&str = concat!(
	"5D1BBE263AFF759E05BA946ADFDBA5961F9AD6E9C060A44CD5D7522A483B3B0CF062A9AB9D8A436682293E0856334",
	"ACE6B00AB9DAB8DAD6B0DFF3F5666BD1F63CA2EEF52B6DDA3DC5582A84A31F11675C22B8880112F634C0FDACC07F6",
	"BF7C53AFFD5F9C091346581FDFACB5FB833ED6F1A3B64C354B7150A8A3CA23AE415ED393CD37563E21188BC69C9FE",
	"E0DF2F3D897AFAA44618A5D947C52CEB13324470B3E06D465FBCBF04D11A1495EF2C218D718E402C0273E27143A95",
	"B897D86B27406571D707A2393BB92DBCEADC8DC4E7E1D1A687A83E31A1F946FAFBB888054CACC6114602F9C9E434C",
	"A7A0CC2D1950C0DA886CEB312AFB0A4BF4037989DBB3158D5AEF2F9AABE22040EC89204E468B1E2127E81F82F419C",
	"60D1E05E01C0FF431AD80507FCEDDF8164552DC859E2A57E7307B0AC2D0C5E93E2CF1EDD96C29FC22166D273DD286",
	"712F32D2AD8E1D026DB873CFC2895A56694861B359162C4DE6D9AAFDE4F422A73393E9E518C773FBA8B6D9067661C",
	"D181D3862E356FA5C153E8682AED19B3CAE017CE21E182E7478F93B072F17A9342606D364AC0C55A13AFFF54D4B87",
	"4DF3DE3834B376147FC0A5E2E8C70ECBE250FD01363F4FAB889F0A7F3B4E8987B09D85E4697462A2A46EA718D077F",
	"C81EA6018724D1F6AA963722AC9F92C5331019ABFCFA612AD36C1FF7E21B7D508B930D287A96014141A7061544B7C",
);

const E1B_CODES:[(usize, &str); 4] = [(1, E1B_PRN_01), (2, E1B_PRN_02), (11, E1B_PRN_11), (20, E1B_PRN_20)];

fn e1b_code_hex(prn:usize) -> Result<&'static str, DigSigProcErr> {
	E1B_CODES.iter().find(|(p, _)| *p == prn).map(|(_, hex)| *hex)
		.ok_or(DigSigProcErr::ConfigurationError("no E1B code table entry for this PRN"))
}

/// Expands one E1B primary code into chips, true for a transmitted 1.
pub fn e1b_code_bool(prn:usize) -> Result<Vec<bool>, DigSigProcErr> {
	let hex:&str = e1b_code_hex(prn)?;
	let mut chips:Vec<bool> = Vec::with_capacity(GALILEO_E1_B_CODE_LENGTH_CHIPS);
	for c in hex.chars() {
		let nibble:u32 = c.to_digit(16).ok_or(DigSigProcErr::Other("non-hex character in E1B code table"))?;
		for bit in (0..4).rev() {
			chips.push(nibble & (1 << bit) != 0);
		}
	}
	Ok(chips)
}

/// Fills `dest` with the sinboc(1,1) modulated E1 ranging code for one PRN at two samples
/// per chip, rotated by `chip_shift` chips.  `dest` must hold exactly one code period.
/// Only the E1B data component is generated; requesting the E1C pilot or its secondary
/// code is rejected.
pub fn e1_code_float_sampled(dest:&mut [f32], signal:&str, use_secondary:bool, prn:usize, chip_shift:f64) -> Result<(), DigSigProcErr> {
	if signal != "1B" { return Err(DigSigProcErr::ConfigurationError("only the E1B data component is generated")); }
	if use_secondary { return Err(DigSigProcErr::ConfigurationError("E1B carries no secondary code")); }
	if dest.len() != REPLICA_LENGTH { return Err(DigSigProcErr::ConfigurationError("replica buffer must hold one code period at 2 samples/chip")); }

	let chips:Vec<bool> = e1b_code_bool(prn)?;

	// sinboc(1,1): each chip spreads into a +1/-1 half-chip pair, sign set by the chip
	let offset_half_chips:usize = wrap_floor(chip_shift * 2.0, REPLICA_LENGTH);
	for k in 0..REPLICA_LENGTH {
		let src:usize = (k + offset_half_chips) % REPLICA_LENGTH;
		let chip:f32 = if chips[src / 2] { 1.0 } else { -1.0 };
		dest[k] = if src % 2 == 0 { chip } else { -chip };
	}

	Ok(())
}
